//! Domain records read from the ledger and the quote type produced by providers.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

pub type OwnerId = String;
pub type RecordId = i64;
pub type CategoryId = i64;
pub type PaymentMethodId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Eur => write!(f, "EUR"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            _ => Err(anyhow::anyhow!("Unsupported currency: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub owner_id: OwnerId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A posted (or future-dated) ledger entry. Negative amounts are expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: RecordId,
    pub owner_id: OwnerId,
    pub category_id: CategoryId,
    pub payment_method_id: PaymentMethodId,
    pub processed_at: DateTime<Utc>,
    pub transfer_amount: Decimal,
    pub receiver: String,
    #[serde(default)]
    pub information: Option<String>,
}

/// A subscription that materializes into one transaction per month on `execute_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringPayment {
    pub id: RecordId,
    pub owner_id: OwnerId,
    pub category_id: CategoryId,
    pub payment_method_id: PaymentMethodId,
    pub execute_at: u32,
    #[serde(default)]
    pub paused: bool,
    pub transfer_amount: Decimal,
    pub receiver: String,
    #[serde(default)]
    pub information: Option<String>,
}

impl RecurringPayment {
    /// Execution date within the given month. Days past the end of the month
    /// fall back to the month's last day.
    pub fn execution_date(&self, year: i32, month: u32) -> Option<NaiveDate> {
        let last = last_day_of_month(year, month)?;
        let day = self.execute_at.min(last.day());
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// The first execution strictly after `today`: this month's date if it is
    /// still ahead, otherwise next month's.
    pub fn next_execution_after(&self, today: NaiveDate) -> Option<NaiveDate> {
        let this_month = self.execution_date(today.year(), today.month())?;
        if this_month > today {
            return Some(this_month);
        }
        let next = today.with_day(1)?.checked_add_months(Months::new(1))?;
        self.execution_date(next.year(), next.month())
    }
}

/// A single purchase lot as stored. `quantity` is validated before aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPosition {
    pub id: RecordId,
    pub owner_id: OwnerId,
    pub exchange_symbol: String,
    pub identifier: String,
    pub quantity: f64,
    pub purchased_at: DateTime<Utc>,
    pub purchase_price: Decimal,
    #[serde(default)]
    pub purchase_fee: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetKind {
    Include,
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: RecordId,
    pub owner_id: OwnerId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BudgetKind,
    pub budget: Decimal,
    #[serde(default)]
    pub categories: BTreeSet<CategoryId>,
}

/// Identifies a quoted instrument: a metal code, or a security on an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentKey {
    pub identifier: String,
    pub exchange: Option<String>,
}

impl InstrumentKey {
    pub fn metal(code: &str) -> Self {
        Self {
            identifier: code.to_uppercase(),
            exchange: None,
        }
    }

    pub fn security(identifier: &str, exchange: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            exchange: Some(exchange.to_string()),
        }
    }
}

impl Display for InstrumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.exchange {
            Some(exchange) => write!(f, "{}@{}", self.identifier, exchange),
            None => write!(f, "{}", self.identifier),
        }
    }
}

/// A current price for one instrument. Lives only in the quote cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub instrument: InstrumentKey,
    pub eur: Option<Decimal>,
    pub usd: Option<Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl Quote {
    pub fn price_in(&self, currency: Currency) -> Option<Decimal> {
        match currency {
            Currency::Eur => self.eur,
            Currency::Usd => self.usd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dividend {
    pub identifier: String,
    pub price: Decimal,
    pub currency: Currency,
    pub payment_date: NaiveDate,
}

/// Inclusive calendar-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn month_of(date: NaiveDate) -> Self {
        let from = date.with_day(1).unwrap_or(date);
        let to = last_day_of_month(date.year(), date.month()).unwrap_or(date);
        Self { from, to }
    }

    /// The month containing `date` plus the `count - 1` months before it.
    pub fn trailing_months(date: NaiveDate, count: u32) -> Self {
        let current = Self::month_of(date);
        let from = current
            .from
            .checked_sub_months(Months::new(count.saturating_sub(1)))
            .unwrap_or(current.from);
        Self {
            from,
            to: current.to,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_of_next.checked_sub_days(Days::new(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(execute_at: u32) -> RecurringPayment {
        RecurringPayment {
            id: 1,
            owner_id: "owner".to_string(),
            category_id: 1,
            payment_method_id: 1,
            execute_at,
            paused: false,
            transfer_amount: Decimal::new(-999, 2),
            receiver: "Streaming".to_string(),
            information: None,
        }
    }

    #[test]
    fn test_execution_date_clamps_to_month_end() {
        let p = payment(31);
        assert_eq!(
            p.execution_date(2025, 4),
            NaiveDate::from_ymd_opt(2025, 4, 30)
        );
        assert_eq!(
            p.execution_date(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            payment(15).execution_date(2025, 2),
            NaiveDate::from_ymd_opt(2025, 2, 15)
        );
    }

    #[test]
    fn test_next_execution_rolls_into_next_month() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(
            payment(31).next_execution_after(today),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(
            payment(10).next_execution_after(NaiveDate::from_ymd_opt(2025, 12, 10).unwrap()),
            NaiveDate::from_ymd_opt(2026, 1, 10)
        );
        assert_eq!(
            payment(20).next_execution_after(NaiveDate::from_ymd_opt(2025, 5, 15).unwrap()),
            NaiveDate::from_ymd_opt(2025, 5, 20)
        );
    }

    #[test]
    fn test_month_of() {
        let range = DateRange::month_of(NaiveDate::from_ymd_opt(2025, 2, 14).unwrap());
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn test_trailing_months() {
        let day = NaiveDate::from_ymd_opt(2025, 2, 14).unwrap();
        let range = DateRange::trailing_months(day, 3);
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(DateRange::trailing_months(day, 0), DateRange::month_of(day));
    }

    #[test]
    fn test_instrument_key_display() {
        assert_eq!(InstrumentKey::metal("xau").to_string(), "XAU");
        assert_eq!(
            InstrumentKey::security("US0378331005", "XNAS").to_string(),
            "US0378331005@XNAS"
        );
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::Eur);
        assert!("GBP".parse::<Currency>().is_err());
    }
}
