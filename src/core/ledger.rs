//! Read access to the persistent store and owner resolution.

use crate::core::error::InsightsError;
use crate::core::model::{
    Budget, Category, DateRange, OwnerId, RecurringPayment, StockPosition, Transaction,
};
use async_trait::async_trait;

/// Owner-scoped reads. Implementations return raw records; validation happens
/// afterwards, so callers must not assume every record is well-formed.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn list_transactions(
        &self,
        owner: &OwnerId,
        range: Option<DateRange>,
    ) -> Result<Vec<Transaction>, InsightsError>;

    async fn list_recurring_payments(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<RecurringPayment>, InsightsError>;

    async fn list_stock_positions(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<StockPosition>, InsightsError>;

    async fn list_budgets(&self, owner: &OwnerId) -> Result<Vec<Budget>, InsightsError>;

    async fn list_categories(&self, owner: &OwnerId) -> Result<Vec<Category>, InsightsError>;
}

/// Whatever identifies the caller of one request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub owner_hint: Option<String>,
}

pub trait OwnerResolver: Send + Sync {
    fn current_owner(&self, ctx: &RequestContext) -> Result<OwnerId, InsightsError>;
}

/// Resolves the owner from the request, falling back to a configured default.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredOwner {
    pub default_owner: Option<String>,
}

impl OwnerResolver for ConfiguredOwner {
    fn current_owner(&self, ctx: &RequestContext) -> Result<OwnerId, InsightsError> {
        ctx.owner_hint
            .as_deref()
            .or(self.default_owner.as_deref())
            .map(str::trim)
            .filter(|owner| !owner.is_empty())
            .map(str::to_string)
            .ok_or(InsightsError::Unauthenticated)
    }
}
