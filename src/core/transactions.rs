//! Income, expense and balance KPIs over a time window.
//!
//! Entries are split into `paid` (processed at or before now) and `upcoming`
//! (future-dated transactions plus projections of active recurring payments),
//! then summed by sign. Calendar dates are taken in the clock's local offset.

use crate::core::model::{
    Category, CategoryId, DateRange, RecordId, RecurringPayment, Transaction,
};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Paid,
    Upcoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    Transaction(RecordId),
    /// Projection of a recurring payment; not correlated with any later posting.
    Recurring(RecordId),
}

/// One signed amount on a local calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub date: NaiveDate,
    pub category_id: CategoryId,
    pub amount: Decimal,
    pub partition: Partition,
    pub source: EntrySource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceKpis {
    pub received_income: Decimal,
    pub upcoming_income: Decimal,
    pub paid_expenses: Decimal,
    pub upcoming_expenses: Decimal,
    pub current_balance: Decimal,
    pub estimated_balance: Decimal,
}

impl BalanceKpis {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        let mut kpis = BalanceKpis::default();
        for entry in entries {
            let income = entry.amount.is_sign_positive();
            match (entry.partition, income) {
                (Partition::Paid, true) => kpis.received_income += entry.amount,
                (Partition::Paid, false) => kpis.paid_expenses += entry.amount.abs(),
                (Partition::Upcoming, true) => kpis.upcoming_income += entry.amount,
                (Partition::Upcoming, false) => kpis.upcoming_expenses += entry.amount.abs(),
            }
        }
        kpis.current_balance = kpis.received_income - kpis.paid_expenses;
        kpis.estimated_balance =
            kpis.current_balance + kpis.upcoming_income - kpis.upcoming_expenses;
        kpis
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBalance {
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    pub kpis: BalanceKpis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMonthBalance {
    pub year: i32,
    pub month: u32,
    pub category_id: CategoryId,
    pub category_name: String,
    #[serde(flatten)]
    pub kpis: BalanceKpis,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub rows: Vec<CategoryMonthBalance>,
    /// Categories referenced by entries but missing from the category list.
    pub unknown_categories: Vec<CategoryId>,
}

/// One category's figures over a whole window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBalance {
    pub category_id: CategoryId,
    pub category_name: String,
    #[serde(flatten)]
    pub kpis: BalanceKpis,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    pub rows: Vec<CategoryBalance>,
    pub unknown_categories: Vec<CategoryId>,
}

/// Category names by id; unlisted ids get a placeholder and are recorded.
struct CategoryNames<'a> {
    names: BTreeMap<CategoryId, &'a str>,
    unknown: BTreeSet<CategoryId>,
}

impl<'a> CategoryNames<'a> {
    fn new(categories: &'a [Category]) -> Self {
        Self {
            names: categories.iter().map(|c| (c.id, c.name.as_str())).collect(),
            unknown: BTreeSet::new(),
        }
    }

    fn name(&mut self, id: CategoryId) -> String {
        match self.names.get(&id) {
            Some(name) => name.to_string(),
            None => {
                self.unknown.insert(id);
                format!("Category #{id}")
            }
        }
    }

    fn unknown(self) -> Vec<CategoryId> {
        self.unknown.into_iter().collect()
    }
}

/// Stateless aggregation pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct TransactionAggregator {
    now: DateTime<FixedOffset>,
}

impl TransactionAggregator {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self { now }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Posted and projected entries inside `window`, optionally restricted to `categories`.
    pub fn entries(
        &self,
        transactions: &[Transaction],
        recurring: &[RecurringPayment],
        window: &DateRange,
        categories: Option<&BTreeSet<CategoryId>>,
    ) -> Vec<Entry> {
        let wanted = |category: CategoryId| categories.is_none_or(|set| set.contains(&category));
        let mut entries = Vec::new();

        for t in transactions {
            let local = t.processed_at.with_timezone(self.now.offset());
            let date = local.date_naive();
            if !window.contains(date) || !wanted(t.category_id) {
                continue;
            }
            let partition = if local <= self.now {
                Partition::Paid
            } else {
                Partition::Upcoming
            };
            entries.push(Entry {
                date,
                category_id: t.category_id,
                amount: t.transfer_amount,
                partition,
                source: EntrySource::Transaction(t.id),
            });
        }

        let today = self.today();
        for payment in recurring.iter().filter(|p| !p.paused) {
            if !wanted(payment.category_id) {
                continue;
            }
            // Only the next execution is projected; days up to today are
            // assumed to have been posted already.
            let Some(date) = payment.next_execution_after(today) else {
                continue;
            };
            if window.contains(date) {
                entries.push(Entry {
                    date,
                    category_id: payment.category_id,
                    amount: payment.transfer_amount,
                    partition: Partition::Upcoming,
                    source: EntrySource::Recurring(payment.id),
                });
            }
        }

        entries
    }

    pub fn kpis(
        &self,
        transactions: &[Transaction],
        recurring: &[RecurringPayment],
        window: &DateRange,
        categories: Option<&BTreeSet<CategoryId>>,
    ) -> BalanceKpis {
        BalanceKpis::from_entries(&self.entries(transactions, recurring, window, categories))
    }

    /// Per-month KPIs, newest month first.
    pub fn by_month(
        &self,
        transactions: &[Transaction],
        recurring: &[RecurringPayment],
        window: &DateRange,
    ) -> Vec<MonthlyBalance> {
        let mut buckets: BTreeMap<(i32, u32), Vec<Entry>> = BTreeMap::new();
        for entry in self.entries(transactions, recurring, window, None) {
            buckets
                .entry(year_month(entry.date))
                .or_default()
                .push(entry);
        }

        buckets
            .into_iter()
            .rev()
            .map(|((year, month), entries)| MonthlyBalance {
                year,
                month,
                kpis: BalanceKpis::from_entries(&entries),
            })
            .collect()
    }

    /// Per-month, per-category KPIs: newest month first, then category name
    /// ascending (ties broken by id).
    pub fn by_category(
        &self,
        transactions: &[Transaction],
        recurring: &[RecurringPayment],
        window: &DateRange,
        categories: &[Category],
    ) -> CategoryBreakdown {
        let mut buckets: BTreeMap<((i32, u32), CategoryId), Vec<Entry>> = BTreeMap::new();
        for entry in self.entries(transactions, recurring, window, None) {
            buckets
                .entry((year_month(entry.date), entry.category_id))
                .or_default()
                .push(entry);
        }

        let mut names = CategoryNames::new(categories);
        let mut rows: Vec<CategoryMonthBalance> = buckets
            .into_iter()
            .map(|(((year, month), category_id), entries)| CategoryMonthBalance {
                year,
                month,
                category_id,
                category_name: names.name(category_id),
                kpis: BalanceKpis::from_entries(&entries),
            })
            .collect();

        rows.sort_by(|a, b| {
            (b.year, b.month)
                .cmp(&(a.year, a.month))
                .then_with(|| a.category_name.cmp(&b.category_name))
                .then_with(|| a.category_id.cmp(&b.category_id))
        });

        CategoryBreakdown {
            rows,
            unknown_categories: names.unknown(),
        }
    }

    /// Per-category KPIs over the whole window without a month split, ordered
    /// by category name (ties broken by id).
    pub fn category_totals(
        &self,
        transactions: &[Transaction],
        recurring: &[RecurringPayment],
        window: &DateRange,
        categories: &[Category],
    ) -> CategoryTotals {
        let mut buckets: BTreeMap<CategoryId, Vec<Entry>> = BTreeMap::new();
        for entry in self.entries(transactions, recurring, window, None) {
            buckets.entry(entry.category_id).or_default().push(entry);
        }

        let mut names = CategoryNames::new(categories);
        let mut rows: Vec<CategoryBalance> = buckets
            .into_iter()
            .map(|(category_id, entries)| CategoryBalance {
                category_id,
                category_name: names.name(category_id),
                kpis: BalanceKpis::from_entries(&entries),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.category_name
                .cmp(&b.category_name)
                .then_with(|| a.category_id.cmp(&b.category_id))
        });

        CategoryTotals {
            rows,
            unknown_categories: names.unknown(),
        }
    }
}

fn year_month(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 5, 15, 12, 0, 0)
            .unwrap()
    }

    fn tx(id: i64, category_id: i64, day: (i32, u32, u32), amount: Decimal) -> Transaction {
        Transaction {
            id,
            owner_id: "alice".to_string(),
            category_id,
            payment_method_id: 1,
            processed_at: Utc
                .with_ymd_and_hms(day.0, day.1, day.2, 9, 0, 0)
                .unwrap(),
            transfer_amount: amount,
            receiver: "Counterparty".to_string(),
            information: None,
        }
    }

    fn recurring(id: i64, execute_at: u32, amount: Decimal, paused: bool) -> RecurringPayment {
        RecurringPayment {
            id,
            owner_id: "alice".to_string(),
            category_id: 9,
            payment_method_id: 1,
            execute_at,
            paused,
            transfer_amount: amount,
            receiver: "Subscription".to_string(),
            information: None,
        }
    }

    fn may() -> DateRange {
        DateRange::month_of(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap())
    }

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            owner_id: "alice".to_string(),
            name: name.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_paid_and_upcoming_split_by_sign() {
        let transactions = vec![
            tx(1, 1, (2025, 5, 1), dec!(3000)),
            tx(2, 2, (2025, 5, 3), dec!(-120.50)),
            tx(3, 2, (2025, 5, 20), dec!(-80)),
            tx(4, 1, (2025, 5, 28), dec!(50)),
            tx(5, 2, (2025, 4, 30), dec!(-999)),
        ];
        let recurring = vec![
            recurring(1, 25, dec!(-15.99), false),
            recurring(2, 10, dec!(-40), false),
            recurring(3, 26, dec!(-100), true),
        ];

        let kpis = TransactionAggregator::new(now()).kpis(&transactions, &recurring, &may(), None);

        assert_eq!(kpis.received_income, dec!(3000));
        assert_eq!(kpis.paid_expenses, dec!(120.50));
        assert_eq!(kpis.upcoming_income, dec!(50));
        assert_eq!(kpis.upcoming_expenses, dec!(95.99));
        assert_eq!(kpis.current_balance, dec!(2879.50));
        assert_eq!(kpis.estimated_balance, dec!(2833.51));
    }

    #[test]
    fn test_current_balance_is_income_minus_expenses() {
        let transactions = vec![
            tx(1, 1, (2025, 5, 1), dec!(0.1)),
            tx(2, 1, (2025, 5, 2), dec!(0.2)),
            tx(3, 2, (2025, 5, 3), dec!(-0.3)),
            tx(4, 2, (2025, 5, 4), dec!(-1234.5678)),
        ];
        let kpis = TransactionAggregator::new(now()).kpis(&transactions, &[], &may(), None);
        assert_eq!(
            kpis.current_balance,
            kpis.received_income - kpis.paid_expenses
        );
        assert_eq!(kpis.current_balance, dec!(-1234.5678));
    }

    #[test]
    fn test_aggregation_is_idempotent_and_leaves_input_untouched() {
        let transactions = vec![
            tx(1, 1, (2025, 5, 1), dec!(10)),
            tx(2, 2, (2025, 5, 20), dec!(-4)),
        ];
        let recurring = vec![recurring(1, 31, dec!(-2), false)];
        let snapshot = transactions.clone();
        let aggregator = TransactionAggregator::new(now());

        let first = aggregator.by_month(&transactions, &recurring, &may());
        let second = aggregator.by_month(&transactions, &recurring, &may());

        assert_eq!(first, second);
        assert_eq!(transactions, snapshot);
    }

    #[test]
    fn test_recurring_projects_only_next_execution() {
        let window = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
        );
        let payments = vec![recurring(1, 20, dec!(-10), false)];
        let aggregator = TransactionAggregator::new(now());

        let entries = aggregator.entries(&[], &payments, &window, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2025, 5, 20).unwrap());
        assert_eq!(entries[0].partition, Partition::Upcoming);

        let kpis = aggregator.kpis(&[], &payments, &window, None);
        assert_eq!(kpis.upcoming_expenses, dec!(10));
    }

    #[test]
    fn test_recurring_next_execution_clamps_and_respects_window() {
        let june = DateRange::month_of(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        let aggregator = TransactionAggregator::new(now());

        // Next run is May 31st, outside June.
        let late = vec![recurring(1, 31, dec!(-10), false)];
        assert!(aggregator.entries(&[], &late, &june, None).is_empty());

        // Day 10 already passed in May, so the next run is June 10th.
        let early = vec![recurring(2, 10, dec!(-10), false)];
        let entries = aggregator.entries(&[], &early, &june, None);
        let dates: Vec<_> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()]);
    }

    #[test]
    fn test_recurring_day_already_passed_is_not_projected() {
        let payments = vec![recurring(1, 15, dec!(-10), false)];
        let entries = TransactionAggregator::new(now()).entries(&[], &payments, &may(), None);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_category_filter_restricts_entries() {
        let transactions = vec![
            tx(1, 1, (2025, 5, 1), dec!(-10)),
            tx(2, 2, (2025, 5, 2), dec!(-20)),
        ];
        let only: BTreeSet<_> = [2].into_iter().collect();
        let kpis = TransactionAggregator::new(now()).kpis(&transactions, &[], &may(), Some(&only));
        assert_eq!(kpis.paid_expenses, dec!(20));
    }

    #[test]
    fn test_by_month_is_newest_first() {
        let window = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
        );
        let transactions = vec![
            tx(1, 1, (2025, 3, 5), dec!(100)),
            tx(2, 1, (2025, 5, 5), dec!(300)),
            tx(3, 1, (2025, 4, 5), dec!(200)),
        ];
        let months = TransactionAggregator::new(now()).by_month(&transactions, &[], &window);

        let keys: Vec<_> = months.iter().map(|m| (m.year, m.month)).collect();
        assert_eq!(keys, vec![(2025, 5), (2025, 4), (2025, 3)]);
        assert_eq!(months[1].kpis.received_income, dec!(200));
    }

    #[test]
    fn test_category_totals_span_the_whole_window() {
        let window = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
        );
        let transactions = vec![
            tx(1, 1, (2025, 3, 2), dec!(-5)),
            tx(2, 1, (2025, 5, 2), dec!(-7)),
            tx(3, 2, (2025, 4, 3), dec!(1200)),
            tx(4, 2, (2025, 5, 20), dec!(300)),
            tx(5, 7, (2025, 4, 4), dec!(-1)),
            tx(6, 1, (2025, 2, 28), dec!(-100)),
        ];
        let recurring = vec![recurring(1, 25, dec!(-15), false)];
        let categories = vec![
            category(1, "Groceries"),
            category(2, "Salary"),
            category(9, "Streaming"),
        ];

        let totals = TransactionAggregator::new(now()).category_totals(
            &transactions,
            &recurring,
            &window,
            &categories,
        );

        let names: Vec<_> = totals
            .rows
            .iter()
            .map(|r| r.category_name.as_str())
            .collect();
        assert_eq!(names, vec!["Category #7", "Groceries", "Salary", "Streaming"]);

        let groceries = &totals.rows[1].kpis;
        assert_eq!(groceries.paid_expenses, dec!(12));
        assert_eq!(groceries.current_balance, dec!(-12));

        let salary = &totals.rows[2].kpis;
        assert_eq!(salary.received_income, dec!(1200));
        assert_eq!(salary.upcoming_income, dec!(300));
        assert_eq!(salary.estimated_balance, dec!(1500));

        assert_eq!(totals.rows[3].kpis.upcoming_expenses, dec!(15));
        assert_eq!(totals.unknown_categories, vec![7]);
    }

    #[test]
    fn test_by_category_ordering_and_unknown_categories() {
        let window = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
        );
        let transactions = vec![
            tx(1, 3, (2025, 4, 2), dec!(-5)),
            tx(2, 1, (2025, 5, 2), dec!(-7)),
            tx(3, 2, (2025, 5, 3), dec!(-9)),
            tx(4, 1, (2025, 4, 4), dec!(-11)),
            tx(5, 42, (2025, 5, 4), dec!(-1)),
        ];
        let categories = vec![
            category(1, "Groceries"),
            category(2, "Dining"),
            category(3, "Utilities"),
        ];

        let breakdown = TransactionAggregator::new(now()).by_category(
            &transactions,
            &[],
            &window,
            &categories,
        );

        let order: Vec<_> = breakdown
            .rows
            .iter()
            .map(|r| (r.month, r.category_name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (5, "Category #42"),
                (5, "Dining"),
                (5, "Groceries"),
                (4, "Groceries"),
                (4, "Utilities"),
            ]
        );
        assert_eq!(breakdown.unknown_categories, vec![42]);
    }
}
