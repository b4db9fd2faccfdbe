use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::feed::with_owners;
use crate::models::{ChannelSummary, Video, VideoView};
use crate::store::{Page, PageParams, Store, StoreResult, VideoFilter, VideoQuery, VideoSort};

pub const SEARCH_PAGE_SIZE: u64 = 12;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub scope: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    All,
    Videos,
    Channels,
}

impl SearchScope {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("videos") => SearchScope::Videos,
            Some("channels") => SearchScope::Channels,
            _ => SearchScope::All,
        }
    }

    fn includes_videos(self) -> bool {
        self != SearchScope::Channels
    }

    fn includes_channels(self) -> bool {
        self != SearchScope::Videos
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSort {
    Relevance,
    Date,
    Views,
}

impl SearchSort {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("date") => SearchSort::Date,
            Some("views") => SearchSort::Views,
            _ => SearchSort::Relevance,
        }
    }

    pub fn video_sort(self) -> VideoSort {
        match self {
            SearchSort::Relevance => VideoSort::Relevance,
            SearchSort::Date => VideoSort::Newest,
            SearchSort::Views => VideoSort::MostViewed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub videos: Vec<VideoView>,
    pub channels: Vec<ChannelSummary>,
    pub total_videos: u64,
    pub total_channels: u64,
    pub page: u64,
    pub query: String,
}

impl SearchResults {
    fn empty(query: String, page: u64) -> Self {
        Self {
            videos: Vec::new(),
            channels: Vec::new(),
            total_videos: 0,
            total_channels: 0,
            page,
            query,
        }
    }
}

pub async fn search(store: &dyn Store, params: &SearchParams) -> Result<SearchResults, AppError> {
    let query = params.q.clone().unwrap_or_default();
    let page = Page::from_params(
        &PageParams {
            page: params.page.clone(),
            limit: params.limit.clone(),
        },
        SEARCH_PAGE_SIZE,
    );
    let mut results = SearchResults::empty(query, page.number);

    let term = results.query.trim().to_string();
    if term.is_empty() {
        return Ok(results);
    }

    let scope = SearchScope::from_param(params.scope.as_deref());
    if scope.includes_videos() {
        let filter = VideoFilter {
            published: Some(true),
            text: Some(term.clone()),
            category: params
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty() && *c != "All")
                .map(String::from),
            ..VideoFilter::default()
        };
        let sort = SearchSort::from_param(params.sort.as_deref()).video_sort();
        let (videos, total) = match run_video_query(store, &filter, sort, page).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Video search for '{}' failed ({}), retrying by view count", term, e);
                run_video_query(store, &filter, VideoSort::MostViewed, page).await?
            }
        };
        results.videos = with_owners(store, videos).await?;
        results.total_videos = total;
    }

    if scope.includes_channels() {
        let (users, total) = store.search_channels(&term, page).await?;
        let ids: Vec<_> = users.iter().map(|u| u.id).collect();
        let counts = store.subscriber_counts(&ids).await?;
        results.channels = users
            .into_iter()
            .map(|u| ChannelSummary {
                subscriber_count: counts.get(&u.id).copied().unwrap_or(0),
                id: u.id,
                name: u.name,
                avatar: u.avatar,
                channel_name: u.channel_name,
                bio: u.bio,
            })
            .collect();
        results.total_channels = total;
    }

    Ok(results)
}

async fn run_video_query(
    store: &dyn Store,
    filter: &VideoFilter,
    sort: VideoSort,
    page: Page,
) -> StoreResult<(Vec<Video>, u64)> {
    let query = VideoQuery::paged(filter.clone(), sort, page);
    futures::try_join!(store.find_videos(&query), store.count_videos(filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::tests::video;
    use crate::models::{Category, User};
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn params(q: &str) -> SearchParams {
        SearchParams {
            q: Some(q.to_string()),
            ..SearchParams::default()
        }
    }

    #[test]
    fn unknown_scope_and_sort_fall_back() {
        assert_eq!(SearchScope::from_param(Some("playlists")), SearchScope::All);
        assert_eq!(SearchSort::from_param(Some("rating")), SearchSort::Relevance);
        assert_eq!(SearchSort::Relevance.video_sort(), VideoSort::Relevance);
        assert_eq!(SearchSort::Date.video_sort(), VideoSort::Newest);
    }

    #[tokio::test]
    async fn blank_query_touches_nothing() {
        let store = MemoryStore::new();
        for q in ["", "   "] {
            let results = search(&store, &params(q)).await.unwrap();
            assert!(results.videos.is_empty());
            assert!(results.channels.is_empty());
            assert_eq!(results.total_videos, 0);
            assert_eq!(results.page, 1);
        }
        assert_eq!(store.probe.reads(), 0);
    }

    #[tokio::test]
    async fn matches_title_description_and_tags_case_insensitively() {
        let store = MemoryStore::new();
        let owner = User::new("Guitar Hero", "hero@example.com", "h".into());
        store.insert_user(&owner).await.unwrap();
        let by_title = video(owner.id, "Learn GUITAR fast", Category::Music, 10);
        let mut by_tag = video(owner.id, "Lesson two", Category::Music, 20);
        by_tag.tags = vec!["Guitar".into()];
        let mut by_description = video(owner.id, "Jam", Category::Music, 5);
        by_description.description = "acoustic guitar session".into();
        let unrelated = video(owner.id, "Drums", Category::Music, 100);
        for v in [&by_title, &by_tag, &by_description, &unrelated] {
            store.insert_video(v).await.unwrap();
        }

        let results = search(&store, &params("guitar")).await.unwrap();
        let titles: Vec<&str> = results.videos.iter().map(|v| v.video.title.as_str()).collect();
        assert_eq!(titles, vec!["Lesson two", "Learn GUITAR fast", "Jam"]);
        assert_eq!(results.total_videos, 3);
        assert_eq!(results.total_channels, 1);
        assert_eq!(results.channels[0].subscriber_count, 0);
        assert_eq!(results.query, "guitar");
    }

    #[tokio::test]
    async fn store_failure_falls_back_to_view_ordering() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let mut older = video(owner, "rust basics", Category::Tech, 100);
        older.created_at = chrono::Utc::now() - chrono::Duration::days(3);
        let newer = video(owner, "rust async", Category::Tech, 1);
        store.insert_video(&older).await.unwrap();
        store.insert_video(&newer).await.unwrap();

        store.probe.fail_next(1);
        let mut p = params("rust");
        p.sort = Some("date".into());
        p.scope = Some("videos".into());
        let results = search(&store, &p).await.unwrap();
        let titles: Vec<&str> = results.videos.iter().map(|v| v.video.title.as_str()).collect();
        assert_eq!(titles, vec!["rust basics", "rust async"]);
        assert!(results.channels.is_empty());
    }

    #[tokio::test]
    async fn channel_scope_skips_video_queries() {
        let store = MemoryStore::new();
        let mut user = User::new("Alice", "alice@example.com", "h".into());
        user.channel_name = "Cooking with A".into();
        store.insert_user(&user).await.unwrap();

        let mut p = params("cooking");
        p.scope = Some("channels".into());
        let results = search(&store, &p).await.unwrap();
        assert_eq!(results.channels.len(), 1);
        assert_eq!(results.channels[0].channel_name, "Cooking with A");
        assert_eq!(results.total_videos, 0);
        assert_eq!(store.probe.reads(), 1);
    }
}
