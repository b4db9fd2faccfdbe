//! Persistence seam. Handlers and composers only see [`Store`]; `PgStore` backs it with
//! Postgres and `MemoryStore` keeps everything in process for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Comment, PlatformStats, Report, ReportStatus, ReportTarget, User, Video};

pub mod memory;
pub mod postgres;
pub mod query;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query::{Page, PageParams, Paginated, Similarity, VideoFilter, VideoQuery, VideoSort};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated; the message names the field.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
    async fn find_admin(&self) -> StoreResult<Option<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<bool>;
    /// Removes the user and every subscription edge touching them.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
    /// Newest first; `search` matches name or email case-insensitively.
    async fn list_users(&self, search: Option<&str>, page: Page) -> StoreResult<(Vec<User>, u64)>;
    /// Case-insensitive substring match on name or channel name.
    async fn search_channels(&self, term: &str, page: Page) -> StoreResult<(Vec<User>, u64)>;

    // subscription edges
    async fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> StoreResult<bool>;
    async fn set_subscription(&self, subscriber: Uuid, channel: Uuid, subscribed: bool) -> StoreResult<()>;
    async fn subscribers_of(&self, channel: Uuid) -> StoreResult<Vec<Uuid>>;
    async fn subscriptions_of(&self, subscriber: Uuid) -> StoreResult<Vec<Uuid>>;
    async fn subscriber_counts(&self, channels: &[Uuid]) -> StoreResult<HashMap<Uuid, u64>>;

    // videos
    async fn insert_video(&self, video: &Video) -> StoreResult<()>;
    async fn find_video(&self, id: Uuid) -> StoreResult<Option<Video>>;
    async fn update_video(&self, video: &Video) -> StoreResult<bool>;
    async fn delete_video(&self, id: Uuid) -> StoreResult<bool>;
    /// Deletes every video owned by `owner` and returns what was removed.
    async fn delete_videos_by_owner(&self, owner: Uuid) -> StoreResult<Vec<Video>>;
    async fn find_videos(&self, query: &VideoQuery) -> StoreResult<Vec<Video>>;
    async fn count_videos(&self, filter: &VideoFilter) -> StoreResult<u64>;
    /// Atomically bumps the view counter and returns the updated record.
    async fn increment_views(&self, id: Uuid) -> StoreResult<Option<Video>>;
    async fn adjust_comment_count(&self, video: Uuid, delta: i64) -> StoreResult<()>;

    // comments
    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()>;
    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn update_comment(&self, comment: &Comment) -> StoreResult<bool>;
    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool>;
    /// Deletes direct replies of `parent`, returning how many went away.
    async fn delete_replies(&self, parent: Uuid) -> StoreResult<u64>;
    async fn delete_comments_for_video(&self, video: Uuid) -> StoreResult<u64>;
    async fn delete_comments_by_user(&self, user: Uuid) -> StoreResult<u64>;
    /// Top-level comments of a video, newest first.
    async fn top_level_comments(&self, video: Uuid, page: Page) -> StoreResult<(Vec<Comment>, u64)>;
    /// Replies to any of `parents`, oldest first.
    async fn replies_to(&self, parents: &[Uuid]) -> StoreResult<Vec<Comment>>;

    // reports
    async fn insert_report(&self, report: &Report) -> StoreResult<()>;
    async fn find_report(&self, id: Uuid) -> StoreResult<Option<Report>>;
    async fn find_pending_report(&self, reporter: Uuid, target: ReportTarget) -> StoreResult<Option<Report>>;
    async fn update_report(&self, report: &Report) -> StoreResult<bool>;
    /// Newest first; `None` lists every status.
    async fn list_reports(&self, status: Option<ReportStatus>, page: Page) -> StoreResult<(Vec<Report>, u64)>;

    async fn stats(&self, since: DateTime<Utc>) -> StoreResult<PlatformStats>;
}
