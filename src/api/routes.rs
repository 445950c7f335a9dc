use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/bmi", post(handlers::calculate_bmi))
        // Catalog
        .route("/meals", get(handlers::list_meals).post(handlers::create_meal))
        .route("/meals/stats", get(handlers::meal_stats))
        // Users
        .route("/users/:id", get(handlers::get_user).put(handlers::upsert_user))
        .route("/users/:id/meals/:meal_id/score", get(handlers::score_meal))
        .route("/users/:id/recommendations", get(handlers::recommendations))
        // Consumption history
        .route("/history", post(handlers::add_history))
        .route("/history/:user_id", get(handlers::get_history))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
