//! Process entry point: loads configuration, connects to Postgres, starts
//! the config store/watcher, the scheduler, and the HTTP server, then waits
//! for a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use rss_comb::config::{Config, ConfigStore, ConfigWatcher};
use rss_comb::http::{self, AppState};
use rss_comb::{Repository, Scheduler};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env().map_err(|e| format!("failed to load configuration: {e}"))?;
    init_logging(config.debug);

    tracing::info!(feeds_dir = %config.feeds_dir.display(), port = config.port, "starting rss-comb");

    let repo = Arc::new(Repository::connect(&config.database_url()).await?);
    if !config.disable_migrate {
        repo.run_migrations().await?;
    } else {
        tracing::info!("DISABLE_MIGRATE set, skipping migration bootstrap");
    }

    let config_store = Arc::new(ConfigStore::new());
    let loaded = config_store.load_dir(&config.feeds_dir).await?;
    tracing::info!(loaded, "loaded per-feed configuration files");

    let http_client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .build()?;

    let (scheduler, queues) = Scheduler::new(
        repo.clone(),
        config_store.clone(),
        http_client,
        config.user_agent.clone(),
        config.worker_count,
        Duration::from_secs(config.scheduler_interval),
    );
    let scheduler = Arc::new(scheduler);
    let cancellation = scheduler.cancellation_token();
    let worker_handles = scheduler.clone().spawn();

    let mut watcher = ConfigWatcher::new(config_store.clone(), config.feeds_dir.clone())?;
    watcher.start()?;
    let watcher_handle = tokio::spawn(watcher.run());

    let app_state = AppState {
        repo,
        config_store,
        queues,
        api_access_key: config.api_access_key.clone(),
        port: config.port,
    };

    let app = http::router(app_state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "listening");

    let server_cancellation = cancellation.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        server_cancellation.cancelled().await;
    });

    tokio::spawn(rss_comb::run_with_shutdown(cancellation.clone()));

    if let Err(e) = server.await {
        tracing::error!(error = %e, "HTTP server exited with an error");
    }

    cancellation.cancel();
    for handle in worker_handles {
        let _ = handle.await;
    }
    watcher_handle.abort();

    tracing::info!("shutdown complete");
    Ok(())
}

fn init_logging(debug: bool) {
    let default_directive = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
