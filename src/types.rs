//! Core domain types shared across the repository, parser, filterer, tasks,
//! and scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Opaque database-assigned identifier for a [`Feed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct FeedDbId(pub i64);

impl std::fmt::Display for FeedDbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque database-assigned identifier for an [`Item`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ItemDbId(pub i64);

impl std::fmt::Display for ItemDbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One configured upstream RSS/Atom source (§3 Feed).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Feed {
    /// Opaque database-assigned identifier.
    pub id: FeedDbId,
    /// Stable external identifier from configuration; unique across configs.
    pub feed_id: String,
    /// Provenance pointer for admin/debug (path of the YAML file this feed came from).
    pub config_file: String,
    /// Upstream URL to fetch.
    pub feed_url: String,
    /// Feed title, from parsed metadata.
    pub title: Option<String>,
    /// Feed homepage link, from parsed metadata.
    pub link: Option<String>,
    /// Feed description, from parsed metadata.
    pub description: Option<String>,
    /// Feed image URL, from parsed metadata.
    pub image_url: Option<String>,
    /// Feed language, from parsed metadata.
    pub language: Option<String>,
    /// Upstream's own `pubDate`/`updated`; the change-detection probe.
    pub feed_published_at: Option<DateTime<Utc>>,
    /// When this feed was last fetched.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// When this feed is next due for a fetch. `NULL` means "due immediately".
    pub next_fetch_at: Option<DateTime<Utc>>,
    /// Scheduling gate; a disabled feed is never scheduled for fetch.
    pub is_enabled: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Advances on every successful processing (including change-detection short-circuits).
    pub updated_at: DateTime<Utc>,
}

/// Extraction status of an item's content (§3 Item).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum ContentExtractionStatus {
    /// Not yet attempted.
    Pending,
    /// Extraction succeeded; `content` holds the extracted article HTML.
    Success,
    /// Extraction was attempted and failed.
    Failed,
    /// Extraction is not applicable to this item (feed has `extract_content` off).
    Skipped,
}

/// One entry within a feed (§3 Item).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Item {
    /// Opaque database-assigned identifier.
    pub id: ItemDbId,
    /// The feed this item belongs to.
    pub feed_id: FeedDbId,
    /// GUID from source, falling back to the normalized link. Non-empty.
    pub guid: String,
    /// Normalized link to the item.
    pub link: Option<String>,
    /// Item title.
    pub title: String,
    /// Item description/summary.
    pub description: Option<String>,
    /// Item content (`content:encoded` when present).
    pub content: Option<String>,
    /// Required, non-null after parse.
    pub published_at: DateTime<Utc>,
    /// Optional upstream "updated" timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Ordered list of author strings (`"email (name)"`, `"name"`, or `"email"`).
    pub authors: Vec<String>,
    /// Ordered list of categories.
    pub categories: Vec<String>,
    /// Stable hash of `title|normalized_link`, used for intra-feed dedup.
    pub content_hash: String,
    /// Whether this item was excluded by the filterer.
    pub is_filtered: bool,
    /// Non-empty when `is_filtered` is true.
    pub filter_reason: Option<String>,
    /// First enclosure's URL, if any.
    pub enclosure_url: Option<String>,
    /// First enclosure's length in bytes, if any.
    pub enclosure_length: Option<i64>,
    /// First enclosure's MIME type, if any.
    pub enclosure_type: Option<String>,
    /// Content extraction state machine: pending → success | failed | skipped.
    pub content_extraction_status: ContentExtractionStatus,
    /// When extraction last completed (success or failure).
    pub content_extracted_at: Option<DateTime<Utc>>,
    /// Error message from the last failed extraction attempt.
    pub content_extraction_error: Option<String>,
    /// Monotonically increasing count of extraction attempts.
    pub extraction_attempts: i32,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

/// Aggregate item counts for a feed.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ItemStats {
    /// Total item count.
    pub total: i64,
    /// Items with `is_filtered = false`.
    pub visible: i64,
    /// Items with `is_filtered = true`.
    pub filtered: i64,
}

/// The four kinds of work the scheduler dispatches (§4.5/§4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TaskKind {
    /// Upsert feed metadata from configuration; priority Top.
    SyncFeedConfig,
    /// Fetch → parse → dedupe → filter → persist; priority High.
    ProcessFeed,
    /// Rerun the filterer against all stored items; priority High.
    RefilterFeed,
    /// Fetch and extract article content for items pending extraction; priority Normal.
    ExtractContent,
}

impl TaskKind {
    /// The queue this task kind is dispatched to.
    pub fn priority(self) -> Priority {
        match self {
            TaskKind::SyncFeedConfig => Priority::Top,
            TaskKind::ProcessFeed | TaskKind::RefilterFeed => Priority::High,
            TaskKind::ExtractContent => Priority::Normal,
        }
    }
}

/// Scheduler priority class (§4.6, §GLOSSARY).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Priority {
    /// Config sync; strictly preempts at the dequeue decision point.
    Top,
    /// Feed processing and refilter.
    High,
    /// Content extraction.
    Normal,
}

/// Unique identifier for an in-memory [`crate::tasks::Task`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
