mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use polyglot_api::auth::{AppState, AppStateInner};
use polyglot_api::pipeline::Pipeline;
use polyglot_api::storage::ArtifactStore;
use polyglot_db::Database;
use polyglot_translate::{LibreTranslate, LibreTranslateConfig, Translator, WhatlangDetector};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polyglot=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);
    match db.prune_expired_sessions() {
        Ok(0) => {}
        Ok(n) => info!("Pruned {} expired sessions", n),
        Err(e) => warn!("Failed to prune sessions: {}", e),
    }

    let uploads = Arc::new(ArtifactStore::new(config.upload_dir.clone()).await?);
    let photos = Arc::new(ArtifactStore::new(config.photo_dir.clone()).await?);

    let backend = LibreTranslate::new(LibreTranslateConfig {
        url: config.translate_url.clone(),
        api_key: config.translate_api_key.clone(),
        timeout: config.translate_timeout,
    })?;
    info!("Translation service: {}", config.translate_url);

    let pipeline = Pipeline::new(
        db.clone(),
        uploads.clone(),
        Arc::new(WhatlangDetector::new()),
        Translator::new(Arc::new(backend)),
    );

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        pipeline,
        uploads,
        photos,
        jwt_secret: config.jwt_secret.clone(),
        session_ttl: chrono::Duration::days(config.session_days),
    });

    let app = polyglot_api::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Polyglot server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
