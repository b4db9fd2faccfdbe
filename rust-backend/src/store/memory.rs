use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Page, Store, StoreError, StoreResult, VideoFilter, VideoQuery};
use crate::models::{Comment, PlatformStats, Report, ReportStatus, ReportTarget, Role, User, Video};

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    videos: HashMap<Uuid, Video>,
    comments: HashMap<Uuid, Comment>,
    reports: HashMap<Uuid, Report>,
    /// (subscriber, channel)
    subscriptions: BTreeSet<(Uuid, Uuid)>,
}

/// Process-local store. Every method takes the lock once, so each call is atomic on its own.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Collections>,
    #[cfg(test)]
    pub(crate) probe: probe::Probe,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn observe_read(&self) -> StoreResult<()> {
        self.probe.observe()
    }

    #[cfg(not(test))]
    fn observe_read(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod probe {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::store::{StoreError, StoreResult};

    /// Counts collection reads and can fail the next few of them.
    #[derive(Default)]
    pub(crate) struct Probe {
        reads: AtomicUsize,
        pending_failures: AtomicUsize,
    }

    impl Probe {
        pub(crate) fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        pub(crate) fn fail_next(&self, count: usize) {
            self.pending_failures.store(count, Ordering::SeqCst);
        }

        pub(crate) fn observe(&self) -> StoreResult<()> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .pending_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            match failing {
                Ok(_) => Err(StoreError::Unavailable("injected failure".into())),
                Err(_) => Ok(()),
            }
        }
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn page_of<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    items
        .iter()
        .skip(page.skip() as usize)
        .take(page.limit as usize)
        .cloned()
        .collect()
}

fn newest_users_first(users: &mut [User]) {
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if data.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email already exists".into()));
        }
        data.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.data.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        self.observe_read()?;
        let data = self.data.read().await;
        Ok(ids.iter().filter_map(|id| data.users.get(id).cloned()).collect())
    }

    async fn find_admin(&self) -> StoreResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.values().find(|u| u.role == Role::Admin).cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        if data
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Conflict("email already exists".into()));
        }
        match data.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        data.subscriptions
            .retain(|(subscriber, channel)| *subscriber != id && *channel != id);
        Ok(data.users.remove(&id).is_some())
    }

    async fn list_users(&self, search: Option<&str>, page: Page) -> StoreResult<(Vec<User>, u64)> {
        let data = self.data.read().await;
        let needle = search.map(str::to_lowercase);
        let mut hits: Vec<User> = data
            .users
            .values()
            .filter(|u| match &needle {
                Some(n) => contains_ci(&u.name, n) || contains_ci(&u.email, n),
                None => true,
            })
            .cloned()
            .collect();
        newest_users_first(&mut hits);
        let total = hits.len() as u64;
        Ok((page_of(&hits, page), total))
    }

    async fn search_channels(&self, term: &str, page: Page) -> StoreResult<(Vec<User>, u64)> {
        self.observe_read()?;
        let data = self.data.read().await;
        let needle = term.to_lowercase();
        let mut hits: Vec<User> = data
            .users
            .values()
            .filter(|u| contains_ci(&u.name, &needle) || contains_ci(&u.channel_name, &needle))
            .cloned()
            .collect();
        newest_users_first(&mut hits);
        let total = hits.len() as u64;
        Ok((page_of(&hits, page), total))
    }

    async fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> StoreResult<bool> {
        Ok(self.data.read().await.subscriptions.contains(&(subscriber, channel)))
    }

    async fn set_subscription(&self, subscriber: Uuid, channel: Uuid, subscribed: bool) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if subscribed {
            data.subscriptions.insert((subscriber, channel));
        } else {
            data.subscriptions.remove(&(subscriber, channel));
        }
        Ok(())
    }

    async fn subscribers_of(&self, channel: Uuid) -> StoreResult<Vec<Uuid>> {
        let data = self.data.read().await;
        Ok(data
            .subscriptions
            .iter()
            .filter(|(_, c)| *c == channel)
            .map(|(s, _)| *s)
            .collect())
    }

    async fn subscriptions_of(&self, subscriber: Uuid) -> StoreResult<Vec<Uuid>> {
        let data = self.data.read().await;
        Ok(data
            .subscriptions
            .iter()
            .filter(|(s, _)| *s == subscriber)
            .map(|(_, c)| *c)
            .collect())
    }

    async fn subscriber_counts(&self, channels: &[Uuid]) -> StoreResult<HashMap<Uuid, u64>> {
        let data = self.data.read().await;
        let mut counts: HashMap<Uuid, u64> = channels.iter().map(|c| (*c, 0)).collect();
        for (_, channel) in data.subscriptions.iter() {
            if let Some(count) = counts.get_mut(channel) {
                *count += 1;
            }
        }
        Ok(counts)
    }

    async fn insert_video(&self, video: &Video) -> StoreResult<()> {
        self.data.write().await.videos.insert(video.id, video.clone());
        Ok(())
    }

    async fn find_video(&self, id: Uuid) -> StoreResult<Option<Video>> {
        Ok(self.data.read().await.videos.get(&id).cloned())
    }

    async fn update_video(&self, video: &Video) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        match data.videos.get_mut(&video.id) {
            Some(existing) => {
                // Counters only move through increment_views and adjust_comment_count.
                let (views, comment_count) = (existing.views, existing.comment_count);
                *existing = video.clone();
                existing.views = views;
                existing.comment_count = comment_count;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_video(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.data.write().await.videos.remove(&id).is_some())
    }

    async fn delete_videos_by_owner(&self, owner: Uuid) -> StoreResult<Vec<Video>> {
        let mut data = self.data.write().await;
        let ids: Vec<Uuid> = data
            .videos
            .values()
            .filter(|v| v.owner_id == owner)
            .map(|v| v.id)
            .collect();
        Ok(ids.iter().filter_map(|id| data.videos.remove(id)).collect())
    }

    async fn find_videos(&self, query: &VideoQuery) -> StoreResult<Vec<Video>> {
        self.observe_read()?;
        let data = self.data.read().await;
        let mut hits: Vec<&Video> = data.videos.values().filter(|v| query.filter.matches(v)).collect();
        hits.sort_by(|a, b| {
            query
                .sort
                .compare(a, b)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(hits
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn count_videos(&self, filter: &VideoFilter) -> StoreResult<u64> {
        self.observe_read()?;
        let data = self.data.read().await;
        Ok(data.videos.values().filter(|v| filter.matches(v)).count() as u64)
    }

    async fn increment_views(&self, id: Uuid) -> StoreResult<Option<Video>> {
        let mut data = self.data.write().await;
        Ok(data.videos.get_mut(&id).map(|video| {
            video.views += 1;
            video.clone()
        }))
    }

    async fn adjust_comment_count(&self, video: Uuid, delta: i64) -> StoreResult<()> {
        if let Some(video) = self.data.write().await.videos.get_mut(&video) {
            video.comment_count += delta;
        }
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.data.write().await.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.data.read().await.comments.get(&id).cloned())
    }

    async fn update_comment(&self, comment: &Comment) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        match data.comments.get_mut(&comment.id) {
            Some(existing) => {
                *existing = comment.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.data.write().await.comments.remove(&id).is_some())
    }

    async fn delete_replies(&self, parent: Uuid) -> StoreResult<u64> {
        let mut data = self.data.write().await;
        let before = data.comments.len();
        data.comments.retain(|_, c| c.parent_comment != Some(parent));
        Ok((before - data.comments.len()) as u64)
    }

    async fn delete_comments_for_video(&self, video: Uuid) -> StoreResult<u64> {
        let mut data = self.data.write().await;
        let before = data.comments.len();
        data.comments.retain(|_, c| c.video_id != video);
        Ok((before - data.comments.len()) as u64)
    }

    async fn delete_comments_by_user(&self, user: Uuid) -> StoreResult<u64> {
        let mut data = self.data.write().await;
        let before = data.comments.len();
        data.comments.retain(|_, c| c.user_id != user);
        Ok((before - data.comments.len()) as u64)
    }

    async fn top_level_comments(&self, video: Uuid, page: Page) -> StoreResult<(Vec<Comment>, u64)> {
        let data = self.data.read().await;
        let mut hits: Vec<Comment> = data
            .comments
            .values()
            .filter(|c| c.video_id == video && c.parent_comment.is_none())
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        let total = hits.len() as u64;
        Ok((page_of(&hits, page), total))
    }

    async fn replies_to(&self, parents: &[Uuid]) -> StoreResult<Vec<Comment>> {
        let data = self.data.read().await;
        let mut hits: Vec<Comment> = data
            .comments
            .values()
            .filter(|c| c.parent_comment.map_or(false, |p| parents.contains(&p)))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(hits)
    }

    async fn insert_report(&self, report: &Report) -> StoreResult<()> {
        self.data.write().await.reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn find_report(&self, id: Uuid) -> StoreResult<Option<Report>> {
        Ok(self.data.read().await.reports.get(&id).cloned())
    }

    async fn find_pending_report(&self, reporter: Uuid, target: ReportTarget) -> StoreResult<Option<Report>> {
        let data = self.data.read().await;
        Ok(data
            .reports
            .values()
            .find(|r| r.reporter_id == reporter && r.target == target && r.status == ReportStatus::Pending)
            .cloned())
    }

    async fn update_report(&self, report: &Report) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        match data.reports.get_mut(&report.id) {
            Some(existing) => {
                *existing = report.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_reports(&self, status: Option<ReportStatus>, page: Page) -> StoreResult<(Vec<Report>, u64)> {
        let data = self.data.read().await;
        let mut hits: Vec<Report> = data
            .reports
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        let total = hits.len() as u64;
        Ok((page_of(&hits, page), total))
    }

    async fn stats(&self, since: DateTime<Utc>) -> StoreResult<PlatformStats> {
        let data = self.data.read().await;
        Ok(PlatformStats {
            total_users: data.users.len() as u64,
            total_videos: data.videos.len() as u64,
            total_comments: data.comments.len() as u64,
            total_reports: data.reports.len() as u64,
            pending_reports: data
                .reports
                .values()
                .filter(|r| r.status == ReportStatus::Pending)
                .count() as u64,
            new_users: data.users.values().filter(|u| u.created_at >= since).count() as u64,
            new_videos: data.videos.values().filter(|v| v.created_at >= since).count() as u64,
            total_views: data.videos.values().map(|v| v.views).sum(),
        })
    }
}
