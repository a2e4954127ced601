//! Ingestion boundary between raw ledger records and the aggregators.
//!
//! Everything that reaches an aggregator has passed through here: it belongs
//! to the requesting owner and its amounts are well-formed. Rejected records
//! are logged and reported, never silently dropped.

use crate::core::error::{RecordKind, SkippedRecord, ValidationError};
use crate::core::model::{
    Budget, InstrumentKey, OwnerId, RecordId, RecurringPayment, StockPosition, Transaction,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::warn;

/// Records that passed validation together with the ones that did not.
#[derive(Debug, Clone)]
pub struct Validated<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRecord>,
}

impl<T> Default for Validated<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

fn partition<R, T>(
    raw: Vec<R>,
    mut check: impl FnMut(R) -> Result<T, ValidationError>,
) -> Validated<T> {
    let mut out = Validated::default();
    for record in raw {
        match check(record) {
            Ok(valid) => out.records.push(valid),
            Err(e) => {
                warn!(kind = %e.kind, id = e.id, reason = %e.reason, "Skipping invalid record");
                out.skipped.push(e.into());
            }
        }
    }
    out
}

fn ensure_owner(
    kind: RecordKind,
    id: RecordId,
    record_owner: &str,
    owner: &OwnerId,
) -> Result<(), ValidationError> {
    if record_owner != owner {
        return Err(ValidationError::new(
            kind,
            id,
            "record belongs to a different owner",
        ));
    }
    Ok(())
}

pub fn transactions(owner: &OwnerId, raw: Vec<Transaction>) -> Validated<Transaction> {
    partition(raw, |t| {
        ensure_owner(RecordKind::Transaction, t.id, &t.owner_id, owner)?;
        if t.transfer_amount.is_zero() {
            return Err(ValidationError::new(
                RecordKind::Transaction,
                t.id,
                "transfer amount is zero",
            ));
        }
        Ok(t)
    })
}

pub fn recurring_payments(
    owner: &OwnerId,
    raw: Vec<RecurringPayment>,
) -> Validated<RecurringPayment> {
    partition(raw, |p| {
        ensure_owner(RecordKind::RecurringPayment, p.id, &p.owner_id, owner)?;
        if !(1..=31).contains(&p.execute_at) {
            return Err(ValidationError::new(
                RecordKind::RecurringPayment,
                p.id,
                format!("execution day {} is outside 1-31", p.execute_at),
            ));
        }
        if p.transfer_amount.is_zero() {
            return Err(ValidationError::new(
                RecordKind::RecurringPayment,
                p.id,
                "transfer amount is zero",
            ));
        }
        Ok(p)
    })
}

pub fn budgets(owner: &OwnerId, raw: Vec<Budget>) -> Validated<Budget> {
    partition(raw, |b| {
        ensure_owner(RecordKind::Budget, b.id, &b.owner_id, owner)?;
        if b.budget.is_sign_negative() {
            return Err(ValidationError::new(
                RecordKind::Budget,
                b.id,
                "budget amount is negative",
            ));
        }
        Ok(b)
    })
}

/// A lot whose quantity has been converted to an exact decimal.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub id: RecordId,
    pub instrument: InstrumentKey,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    pub purchase_fee: Decimal,
    pub purchased_at: DateTime<Utc>,
}

pub fn lots(owner: &OwnerId, raw: Vec<StockPosition>) -> Validated<Lot> {
    partition(raw, |p| {
        let invalid = |reason: &str| ValidationError::new(RecordKind::StockPosition, p.id, reason);
        ensure_owner(RecordKind::StockPosition, p.id, &p.owner_id, owner)?;
        if !p.quantity.is_finite() || p.quantity == 0.0 {
            return Err(invalid("quantity must be a finite, non-zero number"));
        }
        let quantity = Decimal::from_f64(p.quantity)
            .ok_or_else(|| invalid("quantity cannot be represented as a decimal"))?;
        if p.purchase_price.is_sign_negative() || p.purchase_fee.is_sign_negative() {
            return Err(invalid("purchase price and fee must not be negative"));
        }
        if p.identifier.trim().is_empty() || p.exchange_symbol.trim().is_empty() {
            return Err(invalid("identifier and exchange are required"));
        }
        Ok(Lot {
            id: p.id,
            instrument: InstrumentKey::security(p.identifier.trim(), p.exchange_symbol.trim()),
            quantity,
            purchase_price: p.purchase_price,
            purchase_fee: p.purchase_fee,
            purchased_at: p.purchased_at,
        })
    })
}
