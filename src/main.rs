use std::{path::Path, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use movie_recs_api::{
    api::{cors_layer, create_router, AppState},
    config::Config,
    db,
    services::{recommender::GeminiRecommender, RecommendationService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db_pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to open database")?;

    if let Some(dir) = &config.movielens_dir {
        db::import::import_movielens(&db_pool, Path::new(dir))
            .await
            .context("MovieLens import failed")?;
    }

    let recommender = GeminiRecommender::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
        config.recommender_identity(),
    );
    let recommendations = RecommendationService::new(
        db_pool.clone(),
        Arc::new(recommender),
        config.recommender_timeout(),
        config.recommendation_count,
    );

    let candidates = recommendations.refresh_candidates().await?;
    tracing::info!(candidates, "Candidate cache warmed");

    let state = AppState::new(db_pool, recommendations);
    let app = create_router(state).layer(cors_layer(&config.cors_origins()));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
