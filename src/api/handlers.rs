use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{
        CatalogEntry, CatalogStatistics, EligibilityReport, Macros, MealCategory, MealRecord,
        MealSearch, RecommendationResult, ScoreBreakdown, UserProfile,
    },
    services::{
        catalog,
        recommendation::{recommend_for_user, score_meal_for_user},
        RecommendationError, RecommendationRequest,
    },
};

use super::AppState;

// Request/Response types

/// A token list sent either as a JSON array or as one comma-separated string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TokenList {
    List(Vec<String>),
    Text(String),
}

impl TokenList {
    /// Trimmed tokens with blanks and the `None` placeholder removed
    pub fn into_tokens(self) -> Vec<String> {
        let raw = match self {
            TokenList::List(items) => items,
            TokenList::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("none"))
            .collect()
    }
}

fn tokens(list: Option<TokenList>) -> Vec<String> {
    list.map(TokenList::into_tokens).unwrap_or_default()
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct BmiRequest {
    pub height_cm: f64,
    pub weight_kg: f64,
}

#[derive(Debug, Serialize)]
pub struct BmiResponse {
    #[serde(flatten)]
    pub report: EligibilityReport,
    pub category_label: &'static str,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    pub name: String,
    pub category: MealCategory,
    pub calories: u32,
    #[serde(flatten)]
    pub macros: Macros,
    #[serde(default)]
    pub ingredients: Option<TokenList>,
    #[serde(default)]
    pub allergens: Option<TokenList>,
}

#[derive(Debug, Deserialize)]
pub struct UserProfileRequest {
    pub height_cm: f64,
    pub weight_kg: f64,
    #[serde(default)]
    pub allergies: Option<TokenList>,
    #[serde(default)]
    pub preferences: Option<TokenList>,
}

#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub eligibility: EligibilityReport,
}

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub user_id: u64,
    pub meal_id: u64,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub meal_id: u64,
    pub consumed_at: DateTime<Utc>,
    /// Absent when the meal has since left the catalog
    pub meal: Option<MealRecord>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub top_n: Option<usize>,
    pub max_calories: Option<u32>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Classifies height and weight without storing anything
pub async fn calculate_bmi(
    State(state): State<AppState>,
    payload: Result<Json<BmiRequest>, JsonRejection>,
) -> AppResult<Json<BmiResponse>> {
    let request = json_body(payload)?;
    let classifier = state.engine.classifier();
    let report = classifier.classify_user(request.height_cm, request.weight_kg)?;

    let message = if report.program_eligible {
        "You qualify for the weight management program".to_string()
    } else {
        format!(
            "The program starts at a BMI of {}",
            classifier.policy().program_bmi_threshold
        )
    };

    Ok(Json(BmiResponse {
        category_label: report.category.label(),
        report,
        message,
    }))
}

/// Adds a meal to the catalog
pub async fn create_meal(
    State(state): State<AppState>,
    payload: Result<Json<CreateMealRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MealRecord>)> {
    let request = json_body(payload)?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Meal name must not be empty".to_string()));
    }

    let mut inner = state.inner.write().await;
    let id = inner.allocate_meal_id();
    let meal = MealRecord::new(id, name, request.category, request.calories)
        .with_macros(request.macros)
        .with_ingredients(tokens(request.ingredients))
        .with_allergens(tokens(request.allergens));
    inner.meals.insert(id, meal.clone());

    tracing::info!(
        meal_id = id,
        category = %meal.category,
        allergens = meal.allergens.len(),
        "Meal added to catalog"
    );

    Ok((StatusCode::CREATED, Json(meal)))
}

/// Browses the catalog
pub async fn list_meals(
    State(state): State<AppState>,
    Query(query): Query<MealSearch>,
) -> Json<Vec<CatalogEntry>> {
    let inner = state.inner.read().await;
    let meals: Vec<MealRecord> = inner.meals.values().cloned().collect();
    drop(inner);

    let found = catalog::search(&meals, &query);
    Json(catalog::entries(found, state.engine.classifier()))
}

pub async fn meal_stats(State(state): State<AppState>) -> Json<CatalogStatistics> {
    let inner = state.inner.read().await;
    let meals: Vec<MealRecord> = inner.meals.values().cloned().collect();
    drop(inner);

    Json(catalog::summarize(&meals, state.engine.classifier()))
}

/// Creates or replaces a user profile
pub async fn upsert_user(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    payload: Result<Json<UserProfileRequest>, JsonRejection>,
) -> AppResult<Json<UserProfileResponse>> {
    let request = json_body(payload)?;
    let eligibility = state
        .engine
        .classifier()
        .classify_user(request.height_cm, request.weight_kg)?;

    let profile = UserProfile::new(user_id, request.height_cm, request.weight_kg)
        .with_allergies(tokens(request.allergies))
        .with_preferences(tokens(request.preferences));

    state
        .inner
        .write()
        .await
        .users
        .insert(user_id, profile.clone());

    tracing::info!(
        user_id,
        bmi = eligibility.bmi,
        program_eligible = eligibility.program_eligible,
        "User profile stored"
    );

    Ok(Json(UserProfileResponse {
        profile,
        eligibility,
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> AppResult<Json<UserProfileResponse>> {
    let profile = state
        .inner
        .read()
        .await
        .users
        .get(&user_id)
        .cloned()
        .ok_or(RecommendationError::UserNotFound(user_id))?;

    let eligibility = state.engine.classifier().report_for_bmi(profile.bmi());
    Ok(Json(UserProfileResponse {
        profile,
        eligibility,
    }))
}

/// Logs a consumed meal
pub async fn add_history(
    State(state): State<AppState>,
    payload: Result<Json<HistoryRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let request = json_body(payload)?;
    let mut inner = state.inner.write().await;

    if !inner.users.contains_key(&request.user_id) {
        return Err(RecommendationError::UserNotFound(request.user_id).into());
    }
    if !inner.meals.contains_key(&request.meal_id) {
        return Err(RecommendationError::MealNotFound(request.meal_id).into());
    }

    inner
        .history
        .record(request.user_id, request.meal_id, Utc::now());

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Meal added to history successfully" })),
    ))
}

/// The user's history, newest first
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> AppResult<Json<Vec<HistoryEntryResponse>>> {
    let inner = state.inner.read().await;
    if !inner.users.contains_key(&user_id) {
        return Err(RecommendationError::UserNotFound(user_id).into());
    }

    let entries = inner
        .history
        .entries_for(user_id)
        .into_iter()
        .map(|entry| HistoryEntryResponse {
            meal_id: entry.meal_id,
            consumed_at: entry.consumed_at,
            meal: inner.meals.get(&entry.meal_id).cloned(),
        })
        .collect();

    Ok(Json(entries))
}

pub async fn score_meal(
    State(state): State<AppState>,
    Path((user_id, meal_id)): Path<(u64, u64)>,
) -> AppResult<Json<ScoreBreakdown>> {
    let breakdown = score_meal_for_user(&state.engine, &state, &state, user_id, meal_id).await?;
    Ok(Json(breakdown))
}

pub async fn recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<u64>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResult>> {
    let mut request: RecommendationRequest = state.engine.default_request();
    if let Some(top_n) = query.top_n {
        request.top_n_per_category = top_n;
    }
    request.max_calories = query.max_calories;

    tracing::info!(
        request_id = %request_id,
        user_id,
        top_n = request.top_n_per_category,
        "Processing recommendation request"
    );

    let result = recommend_for_user(&state.engine, &state, &state, user_id, &request).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_list_from_string() {
        let list: TokenList = serde_json::from_value(json!("milk, eggs ,,None")).unwrap();
        assert_eq!(list.into_tokens(), vec!["milk", "eggs"]);
    }

    #[test]
    fn test_token_list_from_array() {
        let list: TokenList = serde_json::from_value(json!(["Peanuts", " ", "none"])).unwrap();
        assert_eq!(list.into_tokens(), vec!["Peanuts"]);
    }

    #[test]
    fn test_create_meal_request_accepts_flat_macros() {
        let request: CreateMealRequest = serde_json::from_value(json!({
            "name": "Lentil Soup",
            "category": "lunch",
            "calories": 320,
            "protein_g": 18,
            "fiber_g": 9.5,
            "allergens": "None"
        }))
        .unwrap();

        assert_eq!(request.macros.protein_g, Some(18.0));
        assert_eq!(request.macros.fiber_g, Some(9.5));
        assert!(tokens(request.allergens).is_empty());
    }
}
