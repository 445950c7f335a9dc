use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{ConsumptionHistory, MealRecord, UserProfile},
};

/// Read-only access to the meal catalog
///
/// The recommendation core does not care where meals come from; storage
/// backends plug in here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Snapshot of every meal in the catalog
    async fn meals(&self) -> AppResult<Vec<MealRecord>>;

    async fn meal(&self, meal_id: u64) -> AppResult<Option<MealRecord>>;
}

/// Read-only access to user profiles and their consumption history
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn profile(&self, user_id: u64) -> AppResult<Option<UserProfile>>;

    /// History entries belonging to `user_id`
    async fn history(&self, user_id: u64) -> AppResult<ConsumptionHistory>;
}
