//! Errors that abort a KPI computation, and the per-record rejections that do not.

use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

/// The only failures that surface to the caller as a hard error.
#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("No authenticated owner for this request")]
    Unauthenticated,

    #[error("Persistent store unavailable: {0}")]
    StoreUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Transaction,
    RecurringPayment,
    StockPosition,
    Budget,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordKind::Transaction => "transaction",
            RecordKind::RecurringPayment => "recurring payment",
            RecordKind::StockPosition => "stock position",
            RecordKind::Budget => "budget",
        };
        write!(f, "{name}")
    }
}

/// A record that failed validation at the ingestion boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} #{id}: {reason}")]
pub struct ValidationError {
    pub kind: RecordKind,
    pub id: i64,
    pub reason: String,
}

impl ValidationError {
    pub fn new(kind: RecordKind, id: i64, reason: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            reason: reason.into(),
        }
    }
}

/// A rejected record as reported alongside a KPI response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub kind: RecordKind,
    pub id: i64,
    pub reason: String,
}

impl From<ValidationError> for SkippedRecord {
    fn from(err: ValidationError) -> Self {
        Self {
            kind: err.kind,
            id: err.id,
            reason: err.reason,
        }
    }
}
