use std::collections::{HashMap, HashSet};
use std::time::Instant;

use thiserror::Error;
use tracing::instrument;

use crate::{
    config::{EligibilityPolicy, RecommendationPolicy},
    error::AppResult,
    models::{
        round_to, CategorySelection, ConsumptionHistory, MealCategory, MealRecord,
        RecommendationResult, RecommendationStatistics, RecommendationsByCategory,
        RecommendedMeal, SafetyBucket, ScoreBreakdown, UserProfile,
    },
    services::{
        allergens::AllergenConflictChecker,
        eligibility::EligibilityClassifier,
        scoring::NutritionScorer,
        sources::{CatalogSource, ProfileSource},
    },
};

pub const INSUFFICIENT_DATA_ADVISORY: &str = "Not enough suitable meals were found for every \
     meal type. Please consult a nutritionist or healthcare provider for a personalized plan.";

pub const UNCONFIRMED_ALLERGY_NOTE: &str = "Some recommended meals have no allergen information. \
     Please check their ingredients against your allergies before eating them.";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecommendationError {
    #[error("User not found: {0}")]
    UserNotFound(u64),

    #[error("Meal not found: {0}")]
    MealNotFound(u64),

    #[error("top_n_per_category must be at least 1")]
    InvalidTopN,
}

/// Per-call knobs for [`RecommendationEngine::recommend`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub top_n_per_category: usize,
    /// Requested calorie ceiling; BMI-eligible users are capped lower regardless
    pub max_calories: Option<u32>,
}

impl Default for RecommendationRequest {
    fn default() -> Self {
        Self {
            top_n_per_category: RecommendationPolicy::default().top_n_per_category,
            max_calories: None,
        }
    }
}

/// Candidates of one category, split by how far their allergen status is known
#[derive(Default)]
struct CategoryPool {
    safe: Vec<RecommendedMeal>,
    unconfirmed: Vec<RecommendedMeal>,
}

/// Filters, scores and selects meals per category
#[derive(Debug, Clone)]
pub struct RecommendationEngine<'a> {
    scorer: NutritionScorer<'a>,
    checker: AllergenConflictChecker<'a>,
    classifier: EligibilityClassifier,
    policy: RecommendationPolicy,
}

impl RecommendationEngine<'static> {
    /// Engine over the built-in allergen table
    pub fn with_policies(eligibility: EligibilityPolicy, recommendation: RecommendationPolicy) -> Self {
        Self::new(
            AllergenConflictChecker::default(),
            EligibilityClassifier::new(eligibility),
            recommendation,
        )
    }
}

impl Default for RecommendationEngine<'static> {
    fn default() -> Self {
        Self::with_policies(EligibilityPolicy::default(), RecommendationPolicy::default())
    }
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(
        checker: AllergenConflictChecker<'a>,
        classifier: EligibilityClassifier,
        policy: RecommendationPolicy,
    ) -> Self {
        Self {
            scorer: NutritionScorer::new(checker),
            checker,
            classifier,
            policy,
        }
    }

    pub fn scorer(&self) -> &NutritionScorer<'a> {
        &self.scorer
    }

    pub fn classifier(&self) -> &EligibilityClassifier {
        &self.classifier
    }

    pub fn policy(&self) -> &RecommendationPolicy {
        &self.policy
    }

    /// Request using the configured defaults
    pub fn default_request(&self) -> RecommendationRequest {
        RecommendationRequest {
            top_n_per_category: self.policy.top_n_per_category,
            max_calories: None,
        }
    }

    /// Calorie ceiling for a user. Program-eligible users never exceed the obese cap.
    pub fn calorie_cap(&self, program_eligible: bool, requested: Option<u32>) -> u32 {
        let requested = requested.filter(|c| *c > 0);
        if program_eligible {
            requested
                .unwrap_or(self.policy.obese_calorie_cap)
                .min(self.policy.obese_calorie_cap)
        } else {
            requested.unwrap_or(self.policy.default_calorie_cap)
        }
    }

    /// Scores one meal from `catalog` for `user`
    pub fn score_meal(
        &self,
        user: &UserProfile,
        catalog: &[MealRecord],
        meal_id: u64,
    ) -> Result<ScoreBreakdown, RecommendationError> {
        let meal = catalog
            .iter()
            .find(|m| m.id == meal_id)
            .ok_or(RecommendationError::MealNotFound(meal_id))?;
        Ok(self.scorer.score(meal, user, &user.allergies))
    }

    /// Ranked breakfast, lunch and dinner picks for `user`.
    ///
    /// Meals eaten recently, snacks, meals above the calorie cap and meals with a
    /// confirmed allergen conflict are dropped. The rest are ranked per category,
    /// declared-safe meals first, then meals without allergen data.
    pub fn recommend(
        &self,
        user: &UserProfile,
        catalog: &[MealRecord],
        history: &ConsumptionHistory,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResult, RecommendationError> {
        let top_n = request.top_n_per_category;
        if top_n == 0 {
            return Err(RecommendationError::InvalidTopN);
        }

        let eligibility = self.classifier.report_for_bmi(user.bmi());
        let cap = self.calorie_cap(eligibility.program_eligible, request.max_calories);
        let recent: HashSet<u64> = history
            .recent_meal_ids(user.id, self.policy.recent_history_limit)
            .into_iter()
            .collect();

        let mut stats = RecommendationStatistics {
            catalog_size: catalog.len(),
            max_calories_applied: cap,
            ..Default::default()
        };
        let mut pools: HashMap<MealCategory, CategoryPool> = HashMap::new();

        for meal in catalog {
            if recent.contains(&meal.id) {
                stats.excluded_recent += 1;
                continue;
            }
            if !MealCategory::RECOMMENDED.contains(&meal.category) {
                stats.excluded_uncategorized += 1;
                continue;
            }
            if meal.calories > cap {
                stats.excluded_calorie_cap += 1;
                continue;
            }

            let bucket = if meal.has_declared_allergens() {
                let conflict = self.checker.check(&meal.allergens, &user.allergies);
                if conflict.has_conflict {
                    tracing::debug!(
                        meal_id = meal.id,
                        severity = %conflict.severity,
                        overlapping = ?conflict.overlapping,
                        "Dropping meal with allergen conflict"
                    );
                    stats.excluded_allergen_conflict += 1;
                    continue;
                }
                SafetyBucket::Safe
            } else {
                SafetyBucket::Unconfirmed
            };

            let candidate = RecommendedMeal {
                score: self.scorer.score(meal, user, &user.allergies),
                meets_eligibility_criteria: self.classifier.meal_fits_criteria(meal, eligibility.bmi),
                uncertain_allergens: bucket == SafetyBucket::Unconfirmed,
                bucket,
                meal: meal.clone(),
            };

            let pool = pools.entry(meal.category).or_default();
            match bucket {
                SafetyBucket::Safe => pool.safe.push(candidate),
                SafetyBucket::Unconfirmed => pool.unconfirmed.push(candidate),
            }
        }

        let mut select = |category: MealCategory| {
            let selection = select_top(category, pools.remove(&category).unwrap_or_default(), top_n);
            stats.safe_candidates += selection.safe_candidates;
            stats.unconfirmed_candidates += selection.unconfirmed_candidates;
            selection
        };
        let by_category = RecommendationsByCategory {
            breakfast: select(MealCategory::Breakfast),
            lunch: select(MealCategory::Lunch),
            dinner: select(MealCategory::Dinner),
        };

        let selected: Vec<&RecommendedMeal> =
            by_category.iter().flat_map(|c| c.meals.iter()).collect();
        stats.selected = selected.len();
        if !selected.is_empty() {
            let sum: f64 = selected.iter().map(|m| m.score.total_score).sum();
            stats.average_selected_score = round_to(sum / selected.len() as f64, 2);
        }

        let insufficient_data = by_category.iter().any(|c| c.insufficient);
        if insufficient_data {
            tracing::warn!(
                user_id = user.id,
                breakfast = by_category.breakfast.candidate_count(),
                lunch = by_category.lunch.candidate_count(),
                dinner = by_category.dinner.candidate_count(),
                requested = top_n,
                "Insufficient meal candidates"
            );
        }

        let allergy_note = selected
            .iter()
            .any(|m| m.bucket == SafetyBucket::Unconfirmed)
            .then(|| UNCONFIRMED_ALLERGY_NOTE.to_string());

        Ok(RecommendationResult {
            user_id: user.id,
            eligibility,
            by_category,
            insufficient_data,
            advisory: insufficient_data.then(|| INSUFFICIENT_DATA_ADVISORY.to_string()),
            allergy_note,
            statistics: stats,
        })
    }
}

/// Best first: higher score, then fewer calories, then lower id
fn rank(candidates: &mut [RecommendedMeal]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_score
            .total_cmp(&a.score.total_score)
            .then(a.meal.calories.cmp(&b.meal.calories))
            .then(a.meal.id.cmp(&b.meal.id))
    });
}

fn select_top(category: MealCategory, mut pool: CategoryPool, top_n: usize) -> CategorySelection {
    rank(&mut pool.safe);
    rank(&mut pool.unconfirmed);

    let safe_candidates = pool.safe.len();
    let unconfirmed_candidates = pool.unconfirmed.len();

    let meals: Vec<RecommendedMeal> = pool
        .safe
        .into_iter()
        .chain(pool.unconfirmed)
        .take(top_n)
        .collect();

    CategorySelection {
        category,
        meals,
        safe_candidates,
        unconfirmed_candidates,
        insufficient: safe_candidates + unconfirmed_candidates < top_n,
    }
}

/// Loads the user, their history and the catalog, then runs the engine
#[instrument(skip(engine, profiles, catalog, request))]
pub async fn recommend_for_user(
    engine: &RecommendationEngine<'_>,
    profiles: &dyn ProfileSource,
    catalog: &dyn CatalogSource,
    user_id: u64,
    request: &RecommendationRequest,
) -> AppResult<RecommendationResult> {
    let start = Instant::now();

    let user = profiles
        .profile(user_id)
        .await?
        .ok_or(RecommendationError::UserNotFound(user_id))?;
    let history = profiles.history(user_id).await?;
    let meals = catalog.meals().await?;

    let result = engine.recommend(&user, &meals, &history, request)?;

    tracing::info!(
        user_id,
        catalog_size = result.statistics.catalog_size,
        selected = result.statistics.selected,
        insufficient_data = result.insufficient_data,
        processing_time_ms = start.elapsed().as_millis(),
        "Recommendations computed"
    );

    Ok(result)
}

/// Score breakdown of one catalog meal for one user
#[instrument(skip(engine, profiles, catalog))]
pub async fn score_meal_for_user(
    engine: &RecommendationEngine<'_>,
    profiles: &dyn ProfileSource,
    catalog: &dyn CatalogSource,
    user_id: u64,
    meal_id: u64,
) -> AppResult<ScoreBreakdown> {
    let user = profiles
        .profile(user_id)
        .await?
        .ok_or(RecommendationError::UserNotFound(user_id))?;
    let meal = catalog
        .meal(meal_id)
        .await?
        .ok_or(RecommendationError::MealNotFound(meal_id))?;

    Ok(engine.scorer().score(&meal, &user, &user.allergies))
}
