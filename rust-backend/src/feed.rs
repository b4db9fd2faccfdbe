//! Video listings: home feed, shorts, trending, channel uploads and the subscription feed.

use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{parse_id, AppError};
use crate::models::{OwnerSummary, User, Video, VideoView};
use crate::store::{Page, PageParams, Paginated, Store, StoreResult, VideoFilter, VideoQuery, VideoSort};

pub const FEED_PAGE_SIZE: u64 = 12;
pub const SHORTS_PAGE_SIZE: u64 = 10;
pub const TRENDING_LIMIT: u64 = 12;

/// Query string of `GET /api/videos`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FeedParams {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub owner: Option<String>,
    pub liked: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl FeedParams {
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page.clone(),
            limit: self.limit.clone(),
        }
    }
}

/// Published videos of one length bucket, narrowed to `category` unless it is absent or `"All"`.
/// Category strings are not validated; an unknown one simply matches nothing.
pub fn build_feed_filter(category: Option<&str>, short: bool) -> VideoFilter {
    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "All")
        .map(String::from);
    VideoFilter {
        published: Some(true),
        short: Some(short),
        category,
        ..VideoFilter::default()
    }
}

pub async fn home_feed(
    store: &dyn Store,
    params: &FeedParams,
    viewer: Option<&User>,
) -> Result<Paginated<VideoView>, AppError> {
    let mut filter = build_feed_filter(params.category.as_deref(), false);
    if let Some(owner) = params.owner.as_deref().filter(|o| !o.trim().is_empty()) {
        filter.owner = Some(parse_id(owner)?);
    }
    if params.liked.as_deref() == Some("true") {
        if let Some(viewer) = viewer {
            filter.liked_by = Some(viewer.id);
        }
    }
    let sort = VideoSort::from_param(params.sort.as_deref());
    let page = Page::from_params(&params.page_params(), FEED_PAGE_SIZE);
    Ok(list_videos(store, filter, sort, page).await?)
}

pub async fn shorts(store: &dyn Store, params: &PageParams) -> StoreResult<Paginated<VideoView>> {
    let page = Page::from_params(params, SHORTS_PAGE_SIZE);
    list_videos(store, build_feed_filter(None, true), VideoSort::Newest, page).await
}

/// Most viewed published long-form videos of all time, ties broken by like count.
pub async fn trending(store: &dyn Store, limit: u64) -> StoreResult<Vec<VideoView>> {
    let query = VideoQuery::new(build_feed_filter(None, false), VideoSort::Trending, limit.max(1));
    let videos = store.find_videos(&query).await?;
    with_owners(store, videos).await
}

pub async fn channel_videos(
    store: &dyn Store,
    owner: Uuid,
    sort: VideoSort,
    page: Page,
) -> StoreResult<Paginated<VideoView>> {
    let filter = VideoFilter {
        published: Some(true),
        owner: Some(owner),
        ..VideoFilter::default()
    };
    list_videos(store, filter, sort, page).await
}

/// Published uploads of every channel `user` subscribes to, newest first.
pub async fn subscription_feed(store: &dyn Store, user: &User, page: Page) -> StoreResult<Paginated<VideoView>> {
    let channels = store.subscriptions_of(user.id).await?;
    if channels.is_empty() {
        return Ok(Paginated::new(Vec::new(), page, 0));
    }
    let filter = VideoFilter {
        published: Some(true),
        owners: Some(channels),
        ..VideoFilter::default()
    };
    list_videos(store, filter, VideoSort::Newest, page).await
}

pub async fn list_videos(
    store: &dyn Store,
    filter: VideoFilter,
    sort: VideoSort,
    page: Page,
) -> StoreResult<Paginated<VideoView>> {
    let query = VideoQuery::paged(filter, sort, page);
    let (videos, total) = futures::try_join!(store.find_videos(&query), store.count_videos(&query.filter))?;
    let views = with_owners(store, videos).await?;
    Ok(Paginated::new(views, page, total))
}

/// Attaches the owner summary to each video, in one batched user lookup.
pub async fn with_owners(store: &dyn Store, videos: Vec<Video>) -> StoreResult<Vec<VideoView>> {
    if videos.is_empty() {
        return Ok(Vec::new());
    }
    let mut owner_ids: Vec<Uuid> = videos.iter().map(|v| v.owner_id).collect();
    owner_ids.sort();
    owner_ids.dedup();
    let owners: HashMap<Uuid, OwnerSummary> = store
        .find_users(&owner_ids)
        .await?
        .iter()
        .map(|u| (u.id, u.owner_summary()))
        .collect();

    Ok(videos
        .into_iter()
        .map(|video| {
            let owner = owners
                .get(&video.owner_id)
                .cloned()
                .unwrap_or_else(|| OwnerSummary::deleted(video.owner_id));
            let like_count = video.like_count();
            VideoView {
                video,
                owner,
                like_count,
            }
        })
        .collect())
}

/// Single-video view for the watch page; the owner summary carries the subscriber count.
pub async fn watch_view(store: &dyn Store, video: Video) -> StoreResult<VideoView> {
    let owner_id = video.owner_id;
    let mut views = with_owners(store, vec![video]).await?;
    let counts = store.subscriber_counts(&[owner_id]).await?;
    let mut view = views.remove(0);
    view.owner.subscriber_count = Some(counts.get(&owner_id).copied().unwrap_or(0));
    Ok(view)
}
