use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::Video;

/// Raw `page`/`limit` query parameters. Parsed leniently: garbage falls back to defaults.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Largest offset or limit a backend is asked for; Postgres binds them as `BIGINT`.
pub const MAX_WINDOW: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub limit: u64,
}

impl Page {
    pub fn new(number: u64, limit: u64) -> Self {
        Self {
            number: number.clamp(1, MAX_WINDOW),
            limit: limit.clamp(1, MAX_WINDOW),
        }
    }

    pub fn from_params(params: &PageParams, default_limit: u64) -> Self {
        let number = params
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1) as u64;
        let limit = params
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit as i64) as u64;
        Self::new(number, limit)
    }

    pub fn skip(&self) -> u64 {
        (self.number - 1).saturating_mul(self.limit).min(MAX_WINDOW)
    }

    pub fn pages_for(&self, total: u64) -> u64 {
        (total + self.limit - 1) / self.limit
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub pages: u64,
    pub total: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, page: Page, total: u64) -> Self {
        Self {
            items,
            page: page.number,
            pages: page.pages_for(total),
            total,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            pages: self.pages,
            total: self.total,
        }
    }

    /// Renders `{ <key>: [...], page, pages, total }`, the envelope the web client reads.
    pub fn into_json(self, key: &str) -> Value {
        let mut body = json!({
            "page": self.page,
            "pages": self.pages,
            "total": self.total,
        });
        body[key] = json!(self.items);
        body
    }
}

/// Category-or-shared-tag match used by recommendations.
#[derive(Debug, Clone, PartialEq)]
pub struct Similarity {
    pub category: String,
    pub tags: Vec<String>,
}

/// Conjunction of optional predicates over videos. An unset field matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoFilter {
    pub ids: Option<Vec<Uuid>>,
    pub published: Option<bool>,
    pub short: Option<bool>,
    pub category: Option<String>,
    pub owner: Option<Uuid>,
    pub owners: Option<Vec<Uuid>>,
    pub liked_by: Option<Uuid>,
    pub exclude: Vec<Uuid>,
    pub similar_to: Option<Similarity>,
    pub text: Option<String>,
    pub created_since: Option<DateTime<Utc>>,
}

impl VideoFilter {
    pub fn matches(&self, video: &Video) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&video.id) {
                return false;
            }
        }
        if let Some(published) = self.published {
            if video.is_published != published {
                return false;
            }
        }
        if let Some(short) = self.short {
            if video.is_short != short {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if video.category.as_str() != category {
                return false;
            }
        }
        if let Some(owner) = self.owner {
            if video.owner_id != owner {
                return false;
            }
        }
        if let Some(owners) = &self.owners {
            if !owners.contains(&video.owner_id) {
                return false;
            }
        }
        if let Some(user) = self.liked_by {
            if !video.likes.contains(&user) {
                return false;
            }
        }
        if self.exclude.contains(&video.id) {
            return false;
        }
        if let Some(similar) = &self.similar_to {
            let same_category = video.category.as_str() == similar.category;
            let shared_tag = video.tags.iter().any(|t| similar.tags.contains(t));
            if !same_category && !shared_tag {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = video.title.to_lowercase().contains(&needle)
                || video.description.to_lowercase().contains(&needle)
                || video.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(since) = self.created_since {
            if video.created_at < since {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSort {
    #[default]
    Newest,
    Oldest,
    MostViewed,
    /// Views, then like count.
    Trending,
    /// Views, then newest.
    Popular,
    /// Alias for view-count ordering; no text scoring is computed.
    Relevance,
}

impl VideoSort {
    /// Accepts the client's `sort` parameter (`-createdAt`, `createdAt`, `-views`, ...).
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("createdAt") | Some("oldest") => VideoSort::Oldest,
            Some("-views") | Some("views") | Some("popular") => VideoSort::MostViewed,
            _ => VideoSort::Newest,
        }
    }

    pub fn compare(&self, a: &Video, b: &Video) -> Ordering {
        match self {
            VideoSort::Newest => b.created_at.cmp(&a.created_at),
            VideoSort::Oldest => a.created_at.cmp(&b.created_at),
            VideoSort::MostViewed | VideoSort::Relevance => b.views.cmp(&a.views),
            VideoSort::Trending => b
                .views
                .cmp(&a.views)
                .then_with(|| b.likes.len().cmp(&a.likes.len())),
            VideoSort::Popular => b
                .views
                .cmp(&a.views)
                .then_with(|| b.created_at.cmp(&a.created_at)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoQuery {
    pub filter: VideoFilter,
    pub sort: VideoSort,
    pub skip: u64,
    pub limit: u64,
}

impl VideoQuery {
    pub fn new(filter: VideoFilter, sort: VideoSort, limit: u64) -> Self {
        Self {
            filter,
            sort,
            skip: 0,
            limit: limit.clamp(1, MAX_WINDOW),
        }
    }

    pub fn paged(filter: VideoFilter, sort: VideoSort, page: Page) -> Self {
        Self {
            filter,
            sort,
            skip: page.skip(),
            limit: page.limit,
        }
    }
}
