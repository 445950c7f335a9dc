use nutrition_api::{
    api::{create_router, AppState},
    config::{Config, EligibilityPolicy, RecommendationPolicy},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nutrition_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let eligibility = EligibilityPolicy::from_env()?;
    let recommendation = RecommendationPolicy::from_env()?;

    tracing::info!(
        bmi_threshold = eligibility.program_bmi_threshold,
        top_n = recommendation.top_n_per_category,
        "Policies loaded"
    );

    let state = AppState::with_policies(eligibility, recommendation);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
