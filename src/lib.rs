//! # rss-comb
//!
//! An RSS/Atom feed proxy: ingests a configured set of upstream feeds on a
//! periodic schedule, normalizes them into a canonical item model,
//! deduplicates and filters items per-feed, persists them in Postgres, and
//! re-serves each feed as a clean RSS 2.0 document at a stable local URL.
//!
//! ## Design Philosophy
//!
//! - **Pipeline-first** — fetch, parse, filter, and persist are pure/typed
//!   stages driven by a priority task scheduler, not an ad-hoc poll loop.
//! - **Hot-reloadable configuration** — per-feed YAML rule files can change
//!   on disk without restarting the process.
//! - **Library-first** — the binary in `src/bin/server.rs` is a thin wiring
//!   layer; everything else is usable as a crate.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Per-feed YAML configuration and the process-level environment config.
pub mod config;
/// Repository layer over the `feeds`/`feed_items` tables.
pub mod db;
/// Error types.
pub mod error;
/// Article content extraction (readability).
pub mod extractor;
/// Include/exclude item filtering.
pub mod filter;
/// The external HTTP surface: feed serving and the admin API.
pub mod http;
/// RSS/Atom parsing and normalization.
pub mod parser;
/// Retry classification and capped-exponential backoff.
pub mod retry;
/// RSS 2.0 feed regeneration.
pub mod rss_gen;
/// The priority task scheduler.
pub mod scheduler;
/// The four task variants the scheduler dispatches.
pub mod tasks;
/// Core domain types shared across every module.
pub mod types;

pub use config::Config;
pub use db::Repository;
pub use error::{ApiError, DatabaseError, Error, Result, ToHttpStatus};
pub use scheduler::Scheduler;

/// Waits for a termination signal, then cancels `token` so the scheduler
/// and HTTP server can drain in-flight work before the process exits.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(token: tokio_util::sync::CancellationToken) {
    wait_for_signal().await;
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM");
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("received SIGINT (Ctrl+C)");
            } else {
                tracing::error!("could not register any signal handlers, falling back to ctrl_c");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("received SIGTERM");
            } else {
                tracing::error!("could not register any signal handlers, falling back to ctrl_c");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl+C"),
    }
}
