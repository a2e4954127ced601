//! YAML-backed ledger acting as the persistent store.

use crate::core::error::InsightsError;
use crate::core::ledger::LedgerStore;
use crate::core::model::{
    Budget, Category, DateRange, OwnerId, RecurringPayment, StockPosition, Transaction,
};
use async_trait::async_trait;
use chrono::Days;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerData {
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
    pub recurring_payments: Vec<RecurringPayment>,
    pub stock_positions: Vec<StockPosition>,
    pub budgets: Vec<Budget>,
}

/// Re-reads the file on every query so edits are picked up without a restart.
pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<LedgerData, InsightsError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            InsightsError::StoreUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        let data: LedgerData = serde_yaml::from_str(&text).map_err(|e| {
            InsightsError::StoreUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        debug!(
            path = %self.path.display(),
            transactions = data.transactions.len(),
            positions = data.stock_positions.len(),
            "Loaded ledger"
        );
        Ok(data)
    }
}

fn owned_by<T: Clone>(records: &[T], owner: &OwnerId, owner_of: impl Fn(&T) -> &str) -> Vec<T> {
    records
        .iter()
        .filter(|r| owner_of(r) == owner)
        .cloned()
        .collect()
}

#[async_trait]
impl LedgerStore for LedgerFile {
    async fn list_transactions(
        &self,
        owner: &OwnerId,
        range: Option<DateRange>,
    ) -> Result<Vec<Transaction>, InsightsError> {
        let data = self.load().await?;
        let mut transactions = owned_by(&data.transactions, owner, |t| t.owner_id.as_str());
        if let Some(range) = range {
            // Padded by a day on each side: the aggregator buckets by local date.
            let from = range.from.checked_sub_days(Days::new(1)).unwrap_or(range.from);
            let to = range.to.checked_add_days(Days::new(1)).unwrap_or(range.to);
            let padded = DateRange::new(from, to);
            transactions.retain(|t| padded.contains(t.processed_at.date_naive()));
        }
        Ok(transactions)
    }

    async fn list_recurring_payments(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<RecurringPayment>, InsightsError> {
        let data = self.load().await?;
        Ok(owned_by(&data.recurring_payments, owner, |p| p.owner_id.as_str()))
    }

    async fn list_stock_positions(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<StockPosition>, InsightsError> {
        let data = self.load().await?;
        Ok(owned_by(&data.stock_positions, owner, |p| p.owner_id.as_str()))
    }

    async fn list_budgets(&self, owner: &OwnerId) -> Result<Vec<Budget>, InsightsError> {
        let data = self.load().await?;
        Ok(owned_by(&data.budgets, owner, |b| b.owner_id.as_str()))
    }

    async fn list_categories(&self, owner: &OwnerId) -> Result<Vec<Category>, InsightsError> {
        let data = self.load().await?;
        Ok(owned_by(&data.categories, owner, |c| c.owner_id.as_str()))
    }
}
