use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    config::{EligibilityPolicy, RecommendationPolicy},
    error::AppResult,
    models::{ConsumptionHistory, MealRecord, UserProfile},
    services::{CatalogSource, ProfileSource, RecommendationEngine},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<RwLock<AppStateInner>>,
    pub engine: Arc<RecommendationEngine<'static>>,
}

/// In-memory store behind the lock
pub struct AppStateInner {
    /// Keyed by id so listings come out in insertion order
    pub meals: BTreeMap<u64, MealRecord>,
    pub users: HashMap<u64, UserProfile>,
    pub history: ConsumptionHistory,
    next_meal_id: u64,
}

impl AppStateInner {
    /// Hands out catalog ids starting at 1
    pub fn allocate_meal_id(&mut self) -> u64 {
        let id = self.next_meal_id;
        self.next_meal_id += 1;
        id
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Empty store with default policies
    pub fn new() -> Self {
        Self::with_policies(EligibilityPolicy::default(), RecommendationPolicy::default())
    }

    pub fn with_policies(eligibility: EligibilityPolicy, recommendation: RecommendationPolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AppStateInner {
                meals: BTreeMap::new(),
                users: HashMap::new(),
                history: ConsumptionHistory::new(),
                next_meal_id: 1,
            })),
            engine: Arc::new(RecommendationEngine::with_policies(eligibility, recommendation)),
        }
    }
}

#[async_trait]
impl CatalogSource for AppState {
    async fn meals(&self) -> AppResult<Vec<MealRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.meals.values().cloned().collect())
    }

    async fn meal(&self, meal_id: u64) -> AppResult<Option<MealRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.meals.get(&meal_id).cloned())
    }
}

#[async_trait]
impl ProfileSource for AppState {
    async fn profile(&self, user_id: u64) -> AppResult<Option<UserProfile>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn history(&self, user_id: u64) -> AppResult<ConsumptionHistory> {
        let inner = self.inner.read().await;
        Ok(inner.history.for_user(user_id))
    }
}
