//! Owner-scoped KPI reports: resolve the owner, read the ledger, validate,
//! then hand the clean records to the aggregators.

use crate::core::budget::{BudgetEstimator, BudgetUtilization, EstimatedBudget, category_universe};
use crate::core::clock::Clock;
use crate::core::error::{InsightsError, SkippedRecord};
use crate::core::ledger::{LedgerStore, OwnerResolver, RequestContext};
use crate::core::model::{DateRange, OwnerId};
use crate::core::positions::{PortfolioValuation, PositionAggregator};
use crate::core::transactions::{
    BalanceKpis, CategoryBreakdown, CategoryTotals, MonthlyBalance, TransactionAggregator,
};
use crate::core::validate;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReport {
    pub owner: OwnerId,
    pub window: DateRange,
    #[serde(flatten)]
    pub kpis: BalanceKpis,
    pub months: Vec<MonthlyBalance>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub owner: OwnerId,
    pub window: DateRange,
    #[serde(flatten)]
    pub breakdown: CategoryBreakdown,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotalsReport {
    pub owner: OwnerId,
    pub window: DateRange,
    #[serde(flatten)]
    pub totals: CategoryTotals,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetReport {
    pub owner: OwnerId,
    pub window: DateRange,
    pub budgets: Vec<BudgetUtilization>,
    pub estimated: EstimatedBudget,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioReport {
    pub owner: OwnerId,
    #[serde(flatten)]
    pub valuation: PortfolioValuation,
    pub skipped: Vec<SkippedRecord>,
}

pub struct Insights {
    ledger: Arc<dyn LedgerStore>,
    owners: Arc<dyn OwnerResolver>,
    clock: Arc<dyn Clock>,
}

impl Insights {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        owners: Arc<dyn OwnerResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            owners,
            clock,
        }
    }

    fn aggregator(&self) -> TransactionAggregator {
        TransactionAggregator::new(self.clock.now())
    }

    /// The calendar month containing now.
    pub fn current_month(&self) -> DateRange {
        DateRange::month_of(self.aggregator().today())
    }

    /// Balance KPIs over `window` plus the same figures per month.
    pub async fn balance(
        &self,
        ctx: &RequestContext,
        window: DateRange,
    ) -> Result<BalanceReport, InsightsError> {
        let owner = self.owners.current_owner(ctx)?;
        info!(%owner, from = %window.from, to = %window.to, "Computing balance");

        let transactions = validate::transactions(
            &owner,
            self.ledger.list_transactions(&owner, Some(window)).await?,
        );
        let recurring = validate::recurring_payments(
            &owner,
            self.ledger.list_recurring_payments(&owner).await?,
        );

        let aggregator = self.aggregator();
        let kpis = aggregator.kpis(&transactions.records, &recurring.records, &window, None);
        let months = aggregator.by_month(&transactions.records, &recurring.records, &window);

        Ok(BalanceReport {
            owner,
            window,
            kpis,
            months,
            skipped: [transactions.skipped, recurring.skipped].concat(),
        })
    }

    pub async fn categories(
        &self,
        ctx: &RequestContext,
        window: DateRange,
    ) -> Result<CategoryReport, InsightsError> {
        let owner = self.owners.current_owner(ctx)?;
        info!(%owner, from = %window.from, to = %window.to, "Computing category balances");

        let transactions = validate::transactions(
            &owner,
            self.ledger.list_transactions(&owner, Some(window)).await?,
        );
        let recurring = validate::recurring_payments(
            &owner,
            self.ledger.list_recurring_payments(&owner).await?,
        );
        let categories = self.ledger.list_categories(&owner).await?;

        let breakdown = self.aggregator().by_category(
            &transactions.records,
            &recurring.records,
            &window,
            &categories,
        );

        Ok(CategoryReport {
            owner,
            window,
            breakdown,
            skipped: [transactions.skipped, recurring.skipped].concat(),
        })
    }

    /// Per-category income, expenses and balance over the whole window.
    pub async fn category_totals(
        &self,
        ctx: &RequestContext,
        window: DateRange,
    ) -> Result<CategoryTotalsReport, InsightsError> {
        let owner = self.owners.current_owner(ctx)?;
        info!(%owner, from = %window.from, to = %window.to, "Computing category totals");

        let transactions = validate::transactions(
            &owner,
            self.ledger.list_transactions(&owner, Some(window)).await?,
        );
        let recurring = validate::recurring_payments(
            &owner,
            self.ledger.list_recurring_payments(&owner).await?,
        );
        let categories = self.ledger.list_categories(&owner).await?;

        let totals = self.aggregator().category_totals(
            &transactions.records,
            &recurring.records,
            &window,
            &categories,
        );

        Ok(CategoryTotalsReport {
            owner,
            window,
            totals,
            skipped: [transactions.skipped, recurring.skipped].concat(),
        })
    }

    /// Utilization of every budget for the current month.
    pub async fn budgets(&self, ctx: &RequestContext) -> Result<BudgetReport, InsightsError> {
        let owner = self.owners.current_owner(ctx)?;
        info!(%owner, "Estimating budgets");

        // Full history: exclude-budgets cover every category ever used.
        let transactions =
            validate::transactions(&owner, self.ledger.list_transactions(&owner, None).await?);
        let recurring = validate::recurring_payments(
            &owner,
            self.ledger.list_recurring_payments(&owner).await?,
        );
        let budgets = validate::budgets(&owner, self.ledger.list_budgets(&owner).await?);

        let estimator = BudgetEstimator::new(self.aggregator());
        let universe = category_universe(&transactions.records, &recurring.records);
        let utilization = budgets
            .records
            .iter()
            .map(|b| {
                estimator.utilization(b, &transactions.records, &recurring.records, &universe)
            })
            .collect();
        let estimated = estimator.estimated(&transactions.records, &recurring.records);

        Ok(BudgetReport {
            owner,
            window: *estimator.window(),
            budgets: utilization,
            estimated,
            skipped: [transactions.skipped, recurring.skipped, budgets.skipped].concat(),
        })
    }

    pub async fn portfolio(
        &self,
        ctx: &RequestContext,
        positions: &PositionAggregator,
    ) -> Result<PortfolioReport, InsightsError> {
        let owner = self.owners.current_owner(ctx)?;
        info!(%owner, "Valuating stock positions");

        let lots = validate::lots(&owner, self.ledger.list_stock_positions(&owner).await?);
        let valuation = positions.valuate(&lots.records).await;

        Ok(PortfolioReport {
            owner,
            valuation,
            skipped: lots.skipped,
        })
    }
}
