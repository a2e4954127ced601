//! Budget utilization and the owner-wide monthly estimate.

use crate::core::model::{
    Budget, BudgetKind, CategoryId, DateRange, RecordId, RecurringPayment, Transaction,
};
use crate::core::transactions::{BalanceKpis, TransactionAggregator};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUtilization {
    pub budget_id: RecordId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BudgetKind,
    pub budget: Decimal,
    pub categories: BTreeSet<CategoryId>,
    pub spent: Decimal,
    pub projected_spend: Decimal,
    /// Negative when the projected spend overshoots the budget.
    pub remaining: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpenseSplit {
    pub paid: Decimal,
    pub upcoming: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncomeSplit {
    pub received: Decimal,
    pub upcoming: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedBudget {
    pub expenses: ExpenseSplit,
    pub income: IncomeSplit,
    pub free_amount: Decimal,
}

impl From<&BalanceKpis> for EstimatedBudget {
    fn from(kpis: &BalanceKpis) -> Self {
        let total_income = kpis.received_income + kpis.upcoming_income;
        let total_expenses = kpis.paid_expenses + kpis.upcoming_expenses;
        EstimatedBudget {
            expenses: ExpenseSplit {
                paid: kpis.paid_expenses,
                upcoming: kpis.upcoming_expenses,
            },
            income: IncomeSplit {
                received: kpis.received_income,
                upcoming: kpis.upcoming_income,
            },
            free_amount: total_income - total_expenses,
        }
    }
}

/// Every category the owner has transacted in, posted or recurring.
pub fn category_universe(
    transactions: &[Transaction],
    recurring: &[RecurringPayment],
) -> BTreeSet<CategoryId> {
    transactions
        .iter()
        .map(|t| t.category_id)
        .chain(recurring.iter().map(|p| p.category_id))
        .collect()
}

pub fn effective_categories(
    budget: &Budget,
    universe: &BTreeSet<CategoryId>,
) -> BTreeSet<CategoryId> {
    match budget.kind {
        BudgetKind::Include => budget.categories.clone(),
        BudgetKind::Exclude => universe.difference(&budget.categories).copied().collect(),
    }
}

pub struct BudgetEstimator {
    aggregator: TransactionAggregator,
    window: DateRange,
}

impl BudgetEstimator {
    /// Estimates over the calendar month containing the aggregator's today.
    pub fn new(aggregator: TransactionAggregator) -> Self {
        let window = DateRange::month_of(aggregator.today());
        Self { aggregator, window }
    }

    pub fn window(&self) -> &DateRange {
        &self.window
    }

    /// `universe` must span the owner's full history, not only this month.
    pub fn utilization(
        &self,
        budget: &Budget,
        transactions: &[Transaction],
        recurring: &[RecurringPayment],
        universe: &BTreeSet<CategoryId>,
    ) -> BudgetUtilization {
        let categories = effective_categories(budget, universe);
        let kpis = self
            .aggregator
            .kpis(transactions, recurring, &self.window, Some(&categories));
        let projected_spend = kpis.paid_expenses + kpis.upcoming_expenses;

        BudgetUtilization {
            budget_id: budget.id,
            name: budget.name.clone(),
            kind: budget.kind,
            budget: budget.budget,
            categories,
            spent: kpis.paid_expenses,
            projected_spend,
            remaining: budget.budget - projected_spend,
        }
    }

    /// Owner-wide figures for the month, independent of individual budgets.
    pub fn estimated(
        &self,
        transactions: &[Transaction],
        recurring: &[RecurringPayment],
    ) -> EstimatedBudget {
        let kpis = self
            .aggregator
            .kpis(transactions, recurring, &self.window, None);
        EstimatedBudget::from(&kpis)
    }
}
