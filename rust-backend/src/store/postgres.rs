use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{Page, Store, StoreError, StoreResult, VideoFilter, VideoQuery, VideoSort};
use crate::models::{
    Comment, PlatformStats, Report, ReportStatus, ReportTarget, User, Video, WatchEntry,
};

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations under `migrations/`.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {}", e)))?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_unique(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Conflict("email already exists".into());
        }
    }
    StoreError::Database(err)
}

/// Escapes LIKE metacharacters and wraps the term for a substring match.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    avatar: String,
    banner: String,
    bio: String,
    channel_name: String,
    role: String,
    is_monetized: bool,
    total_views: i64,
    watch_history: Json<Vec<WatchEntry>>,
    watch_later: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            avatar: row.avatar,
            banner: row.banner,
            bio: row.bio,
            channel_name: row.channel_name,
            role: row.role.parse().map_err(StoreError::Corrupt)?,
            is_monetized: row.is_monetized,
            total_views: row.total_views,
            watch_history: row.watch_history.0,
            watch_later: row.watch_later,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct VideoRow {
    id: Uuid,
    title: String,
    description: String,
    video_url: String,
    video_public_id: String,
    thumbnail: String,
    thumbnail_public_id: String,
    duration: f64,
    category: String,
    tags: Vec<String>,
    owner_id: Uuid,
    views: i64,
    likes: Vec<Uuid>,
    dislikes: Vec<Uuid>,
    is_short: bool,
    is_published: bool,
    is_reported: bool,
    comment_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VideoRow> for Video {
    type Error = StoreError;

    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        Ok(Video {
            id: row.id,
            title: row.title,
            description: row.description,
            video_url: row.video_url,
            video_public_id: row.video_public_id,
            thumbnail: row.thumbnail,
            thumbnail_public_id: row.thumbnail_public_id,
            duration: row.duration,
            category: row.category.parse().map_err(StoreError::Corrupt)?,
            tags: row.tags,
            owner_id: row.owner_id,
            views: row.views,
            likes: row.likes,
            dislikes: row.dislikes,
            is_short: row.is_short,
            is_published: row.is_published,
            is_reported: row.is_reported,
            comment_count: row.comment_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    text: String,
    user_id: Uuid,
    video_id: Uuid,
    parent_comment: Option<Uuid>,
    likes: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            text: row.text,
            user_id: row.user_id,
            video_id: row.video_id,
            parent_comment: row.parent_comment,
            likes: row.likes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ReportRow {
    id: Uuid,
    reporter_id: Uuid,
    target_kind: String,
    target_id: Uuid,
    reason: String,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for Report {
    type Error = StoreError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let target = ReportTarget::from_parts(&row.target_kind, row.target_id).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown report target '{}'", row.target_kind))
        })?;
        Ok(Report {
            id: row.id,
            reporter_id: row.reporter_id,
            target,
            reason: row.reason.parse().map_err(StoreError::Corrupt)?,
            description: row.description,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn users_from(rows: Vec<UserRow>) -> StoreResult<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

fn videos_from(rows: Vec<VideoRow>) -> StoreResult<Vec<Video>> {
    rows.into_iter().map(Video::try_from).collect()
}

/// Appends a `WHERE` clause equivalent to [`VideoFilter::matches`].
fn push_video_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &VideoFilter) {
    qb.push(" WHERE TRUE");
    if let Some(ids) = &filter.ids {
        qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(published) = filter.published {
        qb.push(" AND is_published = ").push_bind(published);
    }
    if let Some(short) = filter.short {
        qb.push(" AND is_short = ").push_bind(short);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(owner) = filter.owner {
        qb.push(" AND owner_id = ").push_bind(owner);
    }
    if let Some(owners) = &filter.owners {
        qb.push(" AND owner_id = ANY(").push_bind(owners.clone()).push(")");
    }
    if let Some(user) = filter.liked_by {
        qb.push(" AND ").push_bind(user).push(" = ANY(likes)");
    }
    if !filter.exclude.is_empty() {
        qb.push(" AND id <> ALL(").push_bind(filter.exclude.clone()).push(")");
    }
    if let Some(similar) = &filter.similar_to {
        qb.push(" AND (category = ")
            .push_bind(similar.category.clone())
            .push(" OR tags && ")
            .push_bind(similar.tags.clone())
            .push("::text[])");
    }
    if let Some(text) = &filter.text {
        let pattern = like_pattern(text);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
    if let Some(since) = filter.created_since {
        qb.push(" AND created_at >= ").push_bind(since);
    }
}

fn order_clause(sort: VideoSort) -> &'static str {
    match sort {
        VideoSort::Newest => " ORDER BY created_at DESC, id ASC",
        VideoSort::Oldest => " ORDER BY created_at ASC, id ASC",
        VideoSort::MostViewed | VideoSort::Relevance => " ORDER BY views DESC, created_at DESC, id ASC",
        VideoSort::Trending => " ORDER BY views DESC, cardinality(likes) DESC, created_at DESC, id ASC",
        VideoSort::Popular => " ORDER BY views DESC, created_at DESC, id ASC",
    }
}

fn select_videos(query: &VideoQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT * FROM videos");
    push_video_filter(&mut qb, &query.filter);
    qb.push(order_clause(query.sort));
    qb.push(" LIMIT ").push_bind(query.limit as i64);
    qb.push(" OFFSET ").push_bind(query.skip as i64);
    qb
}

fn count(value: i64) -> u64 {
    value.max(0) as u64
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, avatar, banner, bio, channel_name, role, \
             is_monetized, total_views, watch_history, watch_later, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.banner)
        .bind(&user.bio)
        .bind(&user.channel_name)
        .bind(user.role.as_str())
        .bind(user.is_monetized)
        .bind(user.total_views)
        .bind(Json(&user.watch_history))
        .bind(&user.watch_later)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        users_from(rows)
    }

    async fn find_admin(&self) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE role = 'admin' ORDER BY created_at LIMIT 1")
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, avatar = $5, banner = $6, bio = $7, \
             channel_name = $8, role = $9, is_monetized = $10, total_views = $11, watch_history = $12, \
             watch_later = $13, updated_at = $14 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.banner)
        .bind(&user.bio)
        .bind(&user.channel_name)
        .bind(user.role.as_str())
        .bind(user.is_monetized)
        .bind(user.total_views)
        .bind(Json(&user.watch_history))
        .bind(&user.watch_later)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 OR channel_id = $1")
            .bind(id)
            .execute(&mut tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, search: Option<&str>, page: Page) -> StoreResult<(Vec<User>, u64)> {
        let pattern = search.map(like_pattern);
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1) \
             ORDER BY created_at DESC, id ASC LIMIT $2 OFFSET $3",
        )
        .bind(&pattern)
        .bind(page.limit as i64)
        .bind(page.skip() as i64)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;
        Ok((users_from(rows)?, count(total)))
    }

    async fn search_channels(&self, term: &str, page: Page) -> StoreResult<(Vec<User>, u64)> {
        let pattern = like_pattern(term);
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE name ILIKE $1 OR channel_name ILIKE $1 \
             ORDER BY created_at DESC, id ASC LIMIT $2 OFFSET $3",
        )
        .bind(&pattern)
        .bind(page.limit as i64)
        .bind(page.skip() as i64)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE name ILIKE $1 OR channel_name ILIKE $1")
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;
        Ok((users_from(rows)?, count(total)))
    }

    async fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2)",
        )
        .bind(subscriber)
        .bind(channel)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn set_subscription(&self, subscriber: Uuid, channel: Uuid, subscribed: bool) -> StoreResult<()> {
        let sql = if subscribed {
            "INSERT INTO subscriptions (subscriber_id, channel_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        } else {
            "DELETE FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2"
        };
        sqlx::query(sql)
            .bind(subscriber)
            .bind(channel)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn subscribers_of(&self, channel: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar(
            "SELECT subscriber_id FROM subscriptions WHERE channel_id = $1 ORDER BY created_at",
        )
        .bind(channel)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn subscriptions_of(&self, subscriber: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar(
            "SELECT channel_id FROM subscriptions WHERE subscriber_id = $1 ORDER BY created_at",
        )
        .bind(subscriber)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn subscriber_counts(&self, channels: &[Uuid]) -> StoreResult<HashMap<Uuid, u64>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT channel_id, COUNT(*) FROM subscriptions WHERE channel_id = ANY($1) GROUP BY channel_id",
        )
        .bind(channels.to_vec())
        .fetch_all(&self.pool)
        .await?;
        let mut counts: HashMap<Uuid, u64> = channels.iter().map(|c| (*c, 0)).collect();
        for (channel, n) in rows {
            counts.insert(channel, count(n));
        }
        Ok(counts)
    }

    async fn insert_video(&self, video: &Video) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO videos (id, title, description, video_url, video_public_id, thumbnail, \
             thumbnail_public_id, duration, category, tags, owner_id, views, likes, dislikes, is_short, \
             is_published, is_reported, comment_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
        )
        .bind(video.id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_url)
        .bind(&video.video_public_id)
        .bind(&video.thumbnail)
        .bind(&video.thumbnail_public_id)
        .bind(video.duration)
        .bind(video.category.as_str())
        .bind(&video.tags)
        .bind(video.owner_id)
        .bind(video.views)
        .bind(&video.likes)
        .bind(&video.dislikes)
        .bind(video.is_short)
        .bind(video.is_published)
        .bind(video.is_reported)
        .bind(video.comment_count)
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_video(&self, id: Uuid) -> StoreResult<Option<Video>> {
        sqlx::query_as::<_, VideoRow>("SELECT * FROM videos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Video::try_from)
            .transpose()
    }

    async fn update_video(&self, video: &Video) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE videos SET title = $2, description = $3, video_url = $4, video_public_id = $5, \
             thumbnail = $6, thumbnail_public_id = $7, duration = $8, category = $9, tags = $10, \
             likes = $11, dislikes = $12, is_short = $13, is_published = $14, is_reported = $15, \
             updated_at = $16 WHERE id = $1",
        )
        .bind(video.id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_url)
        .bind(&video.video_public_id)
        .bind(&video.thumbnail)
        .bind(&video.thumbnail_public_id)
        .bind(video.duration)
        .bind(video.category.as_str())
        .bind(&video.tags)
        .bind(&video.likes)
        .bind(&video.dislikes)
        .bind(video.is_short)
        .bind(video.is_published)
        .bind(video.is_reported)
        .bind(video.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_video(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_videos_by_owner(&self, owner: Uuid) -> StoreResult<Vec<Video>> {
        let rows = sqlx::query_as::<_, VideoRow>("DELETE FROM videos WHERE owner_id = $1 RETURNING *")
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        videos_from(rows)
    }

    async fn find_videos(&self, query: &VideoQuery) -> StoreResult<Vec<Video>> {
        let mut qb = select_videos(query);
        let rows = qb.build_query_as::<VideoRow>().fetch_all(&self.pool).await?;
        videos_from(rows)
    }

    async fn count_videos(&self, filter: &VideoFilter) -> StoreResult<u64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM videos");
        push_video_filter(&mut qb, filter);
        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(count(row.try_get::<i64, _>(0)?))
    }

    async fn increment_views(&self, id: Uuid) -> StoreResult<Option<Video>> {
        sqlx::query_as::<_, VideoRow>("UPDATE videos SET views = views + 1 WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Video::try_from)
            .transpose()
    }

    async fn adjust_comment_count(&self, video: Uuid, delta: i64) -> StoreResult<()> {
        sqlx::query("UPDATE videos SET comment_count = comment_count + $2 WHERE id = $1")
            .bind(video)
            .bind(delta)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO comments (id, text, user_id, video_id, parent_comment, likes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(comment.id)
        .bind(&comment.text)
        .bind(comment.user_id)
        .bind(comment.video_id)
        .bind(comment.parent_comment)
        .bind(&comment.likes)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(sqlx::query_as::<_, CommentRow>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Comment::from))
    }

    async fn update_comment(&self, comment: &Comment) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE comments SET text = $2, likes = $3, updated_at = $4 WHERE id = $1")
            .bind(comment.id)
            .bind(&comment.text)
            .bind(&comment.likes)
            .bind(comment.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_replies(&self, parent: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE parent_comment = $1")
            .bind(parent)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_comments_for_video(&self, video: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE video_id = $1")
            .bind(video)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_comments_by_user(&self, user: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE user_id = $1")
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn top_level_comments(&self, video: Uuid, page: Page) -> StoreResult<(Vec<Comment>, u64)> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT * FROM comments WHERE video_id = $1 AND parent_comment IS NULL \
             ORDER BY created_at DESC, id ASC LIMIT $2 OFFSET $3",
        )
        .bind(video)
        .bind(page.limit as i64)
        .bind(page.skip() as i64)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE video_id = $1 AND parent_comment IS NULL",
        )
        .bind(video)
        .fetch_one(&self.pool)
        .await?;
        Ok((rows.into_iter().map(Comment::from).collect(), count(total)))
    }

    async fn replies_to(&self, parents: &[Uuid]) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT * FROM comments WHERE parent_comment = ANY($1) ORDER BY created_at ASC, id ASC",
        )
        .bind(parents.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn insert_report(&self, report: &Report) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO reports (id, reporter_id, target_kind, target_id, reason, description, status, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(report.id)
        .bind(report.reporter_id)
        .bind(report.target.kind())
        .bind(report.target.id())
        .bind(report.reason.as_str())
        .bind(&report.description)
        .bind(report.status.as_str())
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_report(&self, id: Uuid) -> StoreResult<Option<Report>> {
        sqlx::query_as::<_, ReportRow>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Report::try_from)
            .transpose()
    }

    async fn find_pending_report(&self, reporter: Uuid, target: ReportTarget) -> StoreResult<Option<Report>> {
        sqlx::query_as::<_, ReportRow>(
            "SELECT * FROM reports WHERE reporter_id = $1 AND target_kind = $2 AND target_id = $3 \
             AND status = 'pending' LIMIT 1",
        )
        .bind(reporter)
        .bind(target.kind())
        .bind(target.id())
        .fetch_optional(&self.pool)
        .await?
        .map(Report::try_from)
        .transpose()
    }

    async fn update_report(&self, report: &Report) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE reports SET status = $2, description = $3, updated_at = $4 WHERE id = $1")
            .bind(report.id)
            .bind(report.status.as_str())
            .bind(&report.description)
            .bind(report.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reports(&self, status: Option<ReportStatus>, page: Page) -> StoreResult<(Vec<Report>, u64)> {
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query_as::<_, ReportRow>(
            "SELECT * FROM reports WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY created_at DESC, id ASC LIMIT $2 OFFSET $3",
        )
        .bind(status)
        .bind(page.limit as i64)
        .bind(page.skip() as i64)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE ($1::text IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        let reports = rows
            .into_iter()
            .map(Report::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((reports, count(total)))
    }

    async fn stats(&self, since: DateTime<Utc>) -> StoreResult<PlatformStats> {
        let row: (i64, i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT \
             (SELECT COUNT(*) FROM users), \
             (SELECT COUNT(*) FROM videos), \
             (SELECT COUNT(*) FROM comments), \
             (SELECT COUNT(*) FROM reports), \
             (SELECT COUNT(*) FROM reports WHERE status = 'pending'), \
             (SELECT COUNT(*) FROM users WHERE created_at >= $1), \
             (SELECT COUNT(*) FROM videos WHERE created_at >= $1), \
             (SELECT COALESCE(SUM(views), 0)::BIGINT FROM videos)",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(PlatformStats {
            total_users: count(row.0),
            total_videos: count(row.1),
            total_comments: count(row.2),
            total_reports: count(row.3),
            pending_reports: count(row.4),
            new_users: count(row.5),
            new_videos: count(row.6),
            total_views: row.7,
        })
    }
}
