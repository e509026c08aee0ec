use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quoteframe_chat::HttpChatClient;
use quoteframe_imagen::client::HttpImageModel;
use quoteframe_pipeline::blob::S3BlobStore;
use quoteframe_pipeline::worker::JobWorker;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quoteframe_worker=debug,quoteframe_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = quoteframe_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    quoteframe_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection ready");

    // --- External services ---
    let image_api_key = std::env::var("IMAGE_API_KEY").expect("IMAGE_API_KEY must be set");
    let bucket = std::env::var("ARTIFACT_BUCKET").expect("ARTIFACT_BUCKET must be set");
    let base_url = std::env::var("ARTIFACT_BASE_URL").expect("ARTIFACT_BASE_URL must be set");

    let model = HttpImageModel::new(image_api_key);
    let chat = HttpChatClient::new();
    let blob = S3BlobStore::from_env(bucket, base_url).await;
    tracing::info!("External service clients ready");

    // --- Event bus ---
    let event_bus = Arc::new(quoteframe_events::EventBus::default());
    let persistence_handle = tokio::spawn(quoteframe_events::EventPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
    ));

    // --- Claim loop ---
    let worker = JobWorker::new(pool.clone(), model, chat, blob, Arc::clone(&event_bus));
    let cancel = CancellationToken::new();

    let loop_cancel = cancel.clone();
    let loop_handle = tokio::spawn(quoteframe_worker::run(pool, worker, loop_cancel));

    shutdown_signal().await;
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(30), loop_handle).await;

    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
