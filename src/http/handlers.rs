//! Thin handlers over the repositories, config store, and scheduler queues
//! (§6, §7). Handlers do no pipeline work themselves — they read state or
//! enqueue tasks.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;
use utoipa::ToSchema;

use crate::error::{ApiError, ToHttpStatus};
use crate::rss_gen;
use crate::tasks::Task;
use crate::types::{TaskId, TaskKind};

use super::state::AppState;

fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ApiError::new(code, message))).into_response()
}

fn repository_error_response(e: &crate::error::Error) -> Response {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    api_error(status, "repository_error", e.to_string())
}

/// `GET /feeds/:id`: regenerated RSS 2.0 for the feed, or 404/202 per the
/// feed's processing state.
pub async fn get_feed(State(state): State<AppState>, Path(feed_id): Path<String>) -> Response {
    let feed = match state.repo.get_feed_by_id(&feed_id).await {
        Ok(Some(feed)) => feed,
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "not_found", format!("unknown feed '{feed_id}'")),
        Err(e) => return repository_error_response(&e),
    };

    if feed.last_fetched_at.is_none() {
        return StatusCode::ACCEPTED.into_response();
    }

    let items = match state.repo.get_visible_items(feed.id, 100).await {
        Ok(items) => items,
        Err(e) => return repository_error_response(&e),
    };

    let self_link = rss_gen::self_url(None, state.port, &feed.feed_id);
    let xml = rss_gen::generate(&feed, &items, &self_link);

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml; charset=utf-8"),
    );
    if let Ok(v) = HeaderValue::from_str(&feed.feed_id) {
        headers.insert("X-Feed-ID", v);
    }
    if let Ok(v) = HeaderValue::from_str(&items.len().to_string()) {
        headers.insert("X-Feed-Items", v);
    }
    if let Ok(v) = HeaderValue::from_str(&feed.updated_at.to_rfc3339()) {
        headers.insert("X-Last-Updated", v);
    }

    (headers, xml).into_response()
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    enabled_feed_count: i64,
    loaded_config_count: usize,
    timestamp: String,
}

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Response {
    let enabled_feed_count = state.repo.get_enabled_feed_count().await.unwrap_or(0);
    let loaded_config_count = state.config_store.len().await;

    Json(HealthResponse {
        enabled_feed_count,
        loaded_config_count,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
    .into_response()
}

#[derive(Serialize, ToSchema)]
pub struct ServiceDescriptor {
    name: &'static str,
    version: &'static str,
}

/// `GET /`.
pub async fn service_descriptor() -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor {
        name: "rss-comb",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn is_authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = &state.api_access_key else {
        return false;
    };

    let key_header = headers.get("X-API-Key").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    key_header == Some(expected.as_str()) || bearer == Some(expected.as_str())
}

/// Guards every `/api/*` handler: 404 when the admin surface is disabled
/// (no `API_ACCESS_KEY` configured), 401 on a missing/wrong key.
fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Option<Response> {
    if state.api_access_key.is_none() {
        return Some(api_error(StatusCode::NOT_FOUND, "disabled", "admin endpoints are disabled"));
    }
    if !is_authorized(state, headers) {
        return Some(api_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing or invalid API key"));
    }
    None
}

#[derive(Serialize, ToSchema)]
pub struct FeedSummary {
    feed_id: String,
    title: Option<String>,
    is_enabled: bool,
    next_fetch_at: Option<String>,
}

/// `GET /api/feeds`.
pub async fn list_feeds(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(rejection) = authorize_admin(&state, &headers) {
        return rejection;
    }

    let configs = state.config_store.get_all().await;
    let mut summaries = Vec::with_capacity(configs.len());
    for config in configs {
        let feed = state.repo.get_feed_by_id(&config.feed.id).await.ok().flatten();
        summaries.push(FeedSummary {
            feed_id: config.feed.id,
            title: feed.as_ref().and_then(|f| f.title.clone()),
            is_enabled: feed.as_ref().map(|f| f.is_enabled).unwrap_or(config.settings.enabled),
            next_fetch_at: feed.and_then(|f| f.next_fetch_at).map(|t| t.to_rfc3339()),
        });
    }

    Json(summaries).into_response()
}

#[derive(Serialize, ToSchema)]
pub struct FeedDetails {
    feed_id: String,
    title: Option<String>,
    feed_url: String,
    is_enabled: bool,
    item_total: i64,
    item_visible: i64,
    item_filtered: i64,
}

/// `GET /api/feeds/:id/details`.
pub async fn feed_details(State(state): State<AppState>, headers: HeaderMap, Path(feed_id): Path<String>) -> Response {
    if let Some(rejection) = authorize_admin(&state, &headers) {
        return rejection;
    }

    let feed = match state.repo.get_feed_by_id(&feed_id).await {
        Ok(Some(feed)) => feed,
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "not_found", format!("unknown feed '{feed_id}'")),
        Err(e) => return repository_error_response(&e),
    };

    let stats = match state.repo.get_item_stats(feed.id).await {
        Ok(stats) => stats,
        Err(e) => return repository_error_response(&e),
    };

    Json(FeedDetails {
        feed_id: feed.feed_id,
        title: feed.title,
        feed_url: feed.feed_url,
        is_enabled: feed.is_enabled,
        item_total: stats.total,
        item_visible: stats.visible,
        item_filtered: stats.filtered,
    })
    .into_response()
}

/// `POST /api/feeds/:id/reload`: re-reads the feed's config file from disk
/// (notifying the handler chain so the cache actually picks up the edit),
/// then enqueues `SyncFeedConfig` (Top) followed by `RefilterFeed` (High)
/// per spec.md §4.1.
pub async fn reload_feed(State(state): State<AppState>, headers: HeaderMap, Path(feed_id): Path<String>) -> Response {
    if let Some(rejection) = authorize_admin(&state, &headers) {
        return rejection;
    }

    let Some(path) = state.config_store.get_file_for_feed_id(&feed_id).await else {
        return api_error(StatusCode::NOT_FOUND, "not_found", format!("unknown feed '{feed_id}'"));
    };

    if let Err(e) = state.config_store.reload_file(&path).await {
        return repository_error_response(&e);
    }

    enqueue(&state, TaskKind::SyncFeedConfig, &feed_id);
    enqueue(&state, TaskKind::RefilterFeed, &feed_id);

    StatusCode::ACCEPTED.into_response()
}

static NEXT_ADMIN_TASK_ID: AtomicU64 = AtomicU64::new(1 << 40);

fn enqueue(state: &AppState, kind: TaskKind, feed_id: &str) {
    let task = Task::new(TaskId(NEXT_ADMIN_TASK_ID.fetch_add(1, Ordering::Relaxed)), kind, feed_id.to_string());
    if state.queues.try_enqueue(task).is_err() {
        warn!(feed_id, ?kind, "admin-triggered enqueue failed, queue full");
    }
}
