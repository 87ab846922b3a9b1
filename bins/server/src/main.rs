//! Pictor API Server
//!
//! Serves the image library and runs its background tasks: the delete-queue
//! consumer that purges expired recycle-bin entries and the client cache
//! sweeper.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pictor_api::{AppState, create_router};
use pictor_core::crypto::SecretCipher;
use pictor_core::image::ImageService;
use pictor_core::storage::{DEFAULT_SWEEP_INTERVAL, R2ClientFactory};
use pictor_db::{ImageRepository, connect_with};
use pictor_queue::RedisDeleteQueue;
use pictor_shared::AppConfig;
use pictor_shared::config::ENCRYPTION_KEY_ENV;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pictor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let key = config
        .storage
        .resolved_encryption_key()
        .with_context(|| format!("{ENCRYPTION_KEY_ENV} is not set"))?;
    let cipher = SecretCipher::from_encoded(&key).context("Invalid R2 encryption key")?;

    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    let queue = RedisDeleteQueue::connect(&config.redis).await?;

    let service = Arc::new(
        ImageService::new(
            Arc::new(ImageRepository::new(db)),
            Arc::new(queue),
            Arc::new(R2ClientFactory),
            Arc::new(cipher),
        )
        .with_max_upload_bytes(config.storage.max_upload_bytes),
    );

    let shutdown = CancellationToken::new();
    let sweeper = service.spawn_cache_sweeper(DEFAULT_SWEEP_INTERVAL, shutdown.clone());
    let consumer = {
        let service = Arc::clone(&service);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { service.listen_delete_queue(shutdown).await })
    };
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    let app = create_router(
        AppState::new(Arc::clone(&service)),
        config.storage.max_upload_bytes,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    // The server can also stop on its own; make sure the workers follow.
    shutdown.cancel();
    let (sweeper, consumer) = tokio::join!(sweeper, consumer);
    if let Err(e) = sweeper {
        tracing::error!(error = %e, "Cache sweeper task failed");
    }
    if let Err(e) = consumer {
        tracing::error!(error = %e, "Delete queue consumer task failed");
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
