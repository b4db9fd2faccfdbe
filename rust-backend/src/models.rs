use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Most recent entries kept in a user's watch history.
pub const WATCH_HISTORY_LIMIT: usize = 100;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 6;
pub const BIO_MAX_CHARS: usize = 500;
pub const TITLE_MAX_CHARS: usize = 150;
pub const DESCRIPTION_MAX_CHARS: usize = 5000;
pub const COMMENT_MAX_CHARS: usize = 1000;
pub const REPORT_DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Education,
    Gaming,
    Tech,
    Entertainment,
    Music,
    Movies,
    Vlogs,
    Sports,
    News,
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Education,
        Category::Gaming,
        Category::Tech,
        Category::Entertainment,
        Category::Music,
        Category::Movies,
        Category::Vlogs,
        Category::Sports,
        Category::News,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Education => "Education",
            Category::Gaming => "Gaming",
            Category::Tech => "Tech",
            Category::Entertainment => "Entertainment",
            Category::Music => "Music",
            Category::Movies => "Movies",
            Category::Vlogs => "Vlogs",
            Category::Sports => "Sports",
            Category::News => "News",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("'{}' is not a valid category", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    Spam,
    Harassment,
    Inappropriate,
    Copyright,
    Misinformation,
    Other,
}

impl ReportReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportReason::Spam => "spam",
            ReportReason::Harassment => "harassment",
            ReportReason::Inappropriate => "inappropriate",
            ReportReason::Copyright => "copyright",
            ReportReason::Misinformation => "misinformation",
            ReportReason::Other => "other",
        }
    }
}

impl FromStr for ReportReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spam" => Ok(ReportReason::Spam),
            "harassment" => Ok(ReportReason::Harassment),
            "inappropriate" => Ok(ReportReason::Inappropriate),
            "copyright" => Ok(ReportReason::Copyright),
            "misinformation" => Ok(ReportReason::Misinformation),
            "other" => Ok(ReportReason::Other),
            other => Err(format!("'{}' is not a valid report reason", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    /// Reports only ever move away from `pending`.
    pub fn can_become(&self, next: ReportStatus) -> bool {
        next != ReportStatus::Pending || *self == ReportStatus::Pending
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "reviewed" => Ok(ReportStatus::Reviewed),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            other => Err(format!("'{}' is not a valid report status", other)),
        }
    }
}

/// What a report points at. Exactly one target per report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ReportTarget {
    Video(Uuid),
    Comment(Uuid),
}

impl ReportTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            ReportTarget::Video(_) => "video",
            ReportTarget::Comment(_) => "comment",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ReportTarget::Video(id) | ReportTarget::Comment(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "video" => Some(ReportTarget::Video(id)),
            "comment" => Some(ReportTarget::Comment(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEntry {
    pub video: Uuid,
    pub watched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: String,
    pub banner: String,
    pub bio: String,
    pub channel_name: String,
    pub role: Role,
    pub is_monetized: bool,
    pub total_views: i64,
    pub watch_history: Vec<WatchEntry>,
    pub watch_later: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, email: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            avatar: default_avatar_url(name),
            banner: String::new(),
            bio: String::new(),
            channel_name: name.to_string(),
            role: Role::User,
            is_monetized: false,
            total_views: 0,
            watch_history: Vec::new(),
            watch_later: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Moves `video` to the front of the history, dropping any older entry for it.
    pub fn record_watch(&mut self, video: Uuid, at: DateTime<Utc>) {
        self.watch_history.retain(|entry| entry.video != video);
        self.watch_history.insert(0, WatchEntry { video, watched_at: at });
        self.watch_history.truncate(WATCH_HISTORY_LIMIT);
    }

    /// Returns true when the video is saved after the toggle.
    pub fn toggle_watch_later(&mut self, video: Uuid) -> bool {
        if let Some(pos) = self.watch_later.iter().position(|id| *id == video) {
            self.watch_later.remove(pos);
            false
        } else {
            self.watch_later.push(video);
            true
        }
    }

    pub fn owner_summary(&self) -> OwnerSummary {
        OwnerSummary {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            channel_name: self.channel_name.clone(),
            subscriber_count: None,
        }
    }
}

pub fn default_avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=7c3aed&color=fff&size=200",
        urlencoding::encode(name)
    )
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub video_public_id: String,
    pub thumbnail: String,
    pub thumbnail_public_id: String,
    pub duration: f64,
    pub category: Category,
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    pub views: i64,
    pub likes: Vec<Uuid>,
    pub dislikes: Vec<Uuid>,
    pub is_short: bool,
    pub is_published: bool,
    pub is_reported: bool,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionState {
    pub likes: usize,
    pub dislikes: usize,
    pub is_liked: bool,
    pub is_disliked: bool,
}

impl Video {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    /// Like toggles off when already liked; liking always clears a dislike by the same user.
    pub fn toggle_like(&mut self, user: Uuid) -> ReactionState {
        if let Some(pos) = self.likes.iter().position(|id| *id == user) {
            self.likes.remove(pos);
        } else {
            self.likes.push(user);
            self.dislikes.retain(|id| *id != user);
        }
        self.reaction_state(user)
    }

    pub fn toggle_dislike(&mut self, user: Uuid) -> ReactionState {
        if let Some(pos) = self.dislikes.iter().position(|id| *id == user) {
            self.dislikes.remove(pos);
        } else {
            self.dislikes.push(user);
            self.likes.retain(|id| *id != user);
        }
        self.reaction_state(user)
    }

    pub fn reaction_state(&self, user: Uuid) -> ReactionState {
        ReactionState {
            likes: self.likes.len(),
            dislikes: self.dislikes.len(),
            is_liked: self.likes.contains(&user),
            is_disliked: self.dislikes.contains(&user),
        }
    }

    pub fn is_owned_by(&self, user: &User) -> bool {
        self.owner_id == user.id
    }
}

/// Splits a comma separated tag list, dropping empty entries.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub parent_comment: Option<Uuid>,
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(text: &str, user_id: Uuid, video_id: Uuid, parent_comment: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            text: text.to_string(),
            user_id,
            video_id,
            parent_comment,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_comment.is_some()
    }

    /// Returns true when liked after the toggle.
    pub fn toggle_like(&mut self, user: Uuid) -> bool {
        if let Some(pos) = self.likes.iter().position(|id| *id == user) {
            self.likes.remove(pos);
            false
        } else {
            self.likes.push(user);
            true
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub target: ReportTarget,
    pub reason: ReportReason,
    pub description: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(reporter_id: Uuid, target: ReportTarget, reason: ReportReason, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reporter_id,
            target,
            reason,
            description,
            status: ReportStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_users: u64,
    pub total_videos: u64,
    pub total_comments: u64,
    pub total_reports: u64,
    pub pending_reports: u64,
    pub new_users: u64,
    pub new_videos: u64,
    pub total_views: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
    pub parent_comment: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ReportRequest {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportStatusRequest {
    #[serde(alias = "action")]
    pub status: String,
}

/// Display fields of a video or comment author.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    pub channel_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_count: Option<u64>,
}

impl OwnerSummary {
    /// Placeholder for records whose author no longer exists.
    pub fn deleted(id: Uuid) -> Self {
        Self {
            id,
            name: "Deleted user".to_string(),
            avatar: String::new(),
            channel_name: String::new(),
            subscriber_count: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    #[serde(flatten)]
    pub video: Video,
    pub owner: OwnerSummary,
    pub like_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    pub channel_name: String,
    pub bio: String,
    pub subscriber_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: OwnerSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentView>>,
}

pub fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_video() -> Video {
        let now = Utc::now();
        Video {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: String::new(),
            video_url: String::new(),
            video_public_id: String::new(),
            thumbnail: String::new(),
            thumbnail_public_id: String::new(),
            duration: 0.0,
            category: Category::Music,
            tags: vec![],
            owner_id: Uuid::new_v4(),
            views: 0,
            likes: vec![],
            dislikes: vec![],
            is_short: false,
            is_published: true,
            is_reported: false,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn likes_and_dislikes_stay_disjoint() {
        let mut video = sample_video();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        video.toggle_dislike(other);
        for step in 0..7 {
            if step % 3 == 0 {
                video.toggle_dislike(user);
            } else {
                video.toggle_like(user);
            }
            assert!(
                !(video.likes.contains(&user) && video.dislikes.contains(&user)),
                "user both liked and disliked after step {}",
                step
            );
        }
        assert!(video.dislikes.contains(&other));
    }

    #[test]
    fn second_like_restores_count() {
        let mut video = sample_video();
        let user = Uuid::new_v4();
        let before = video.like_count();

        let first = video.toggle_like(user);
        assert!(first.is_liked);
        assert_eq!(first.likes, before + 1);

        let second = video.toggle_like(user);
        assert!(!second.is_liked);
        assert_eq!(second.likes, before);
    }

    #[test]
    fn dislike_clears_existing_like() {
        let mut video = sample_video();
        let user = Uuid::new_v4();
        video.toggle_like(user);
        let state = video.toggle_dislike(user);
        assert_eq!(state, ReactionState { likes: 0, dislikes: 1, is_liked: false, is_disliked: true });
    }

    #[test]
    fn watch_history_moves_duplicates_to_front_and_caps() {
        let mut user = User::new("Viewer", "viewer@example.com", "hash".into());
        let start = Utc::now();
        let ids: Vec<Uuid> = (0..120).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            user.record_watch(*id, start + chrono::Duration::seconds(i as i64));
        }
        assert_eq!(user.watch_history.len(), WATCH_HISTORY_LIMIT);
        assert_eq!(user.watch_history[0].video, ids[119]);

        let replay = ids[110];
        user.record_watch(replay, start + chrono::Duration::seconds(500));
        assert_eq!(user.watch_history.len(), WATCH_HISTORY_LIMIT);
        assert_eq!(user.watch_history[0].video, replay);
        assert_eq!(user.watch_history.iter().filter(|e| e.video == replay).count(), 1);
        assert!(user
            .watch_history
            .windows(2)
            .all(|pair| pair[0].watched_at >= pair[1].watched_at));
    }

    #[test]
    fn watch_later_toggles() {
        let mut user = User::new("Viewer", "viewer@example.com", "hash".into());
        let video = Uuid::new_v4();
        assert!(user.toggle_watch_later(video));
        assert!(!user.toggle_watch_later(video));
        assert!(user.watch_later.is_empty());
    }

    #[test]
    fn report_status_never_returns_to_pending() {
        assert!(ReportStatus::Pending.can_become(ReportStatus::Resolved));
        assert!(ReportStatus::Reviewed.can_become(ReportStatus::Dismissed));
        assert!(!ReportStatus::Resolved.can_become(ReportStatus::Pending));
    }

    #[test]
    fn report_target_serializes_as_tagged_variant() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(ReportTarget::Comment(id)).unwrap();
        assert_eq!(json["kind"], "comment");
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn categories_parse_exactly() {
        assert_eq!("Music".parse::<Category>().unwrap(), Category::Music);
        assert!("music".parse::<Category>().is_err());
        assert!("Musik".parse::<Category>().is_err());
    }

    #[test]
    fn tags_are_trimmed() {
        assert_eq!(parse_tags(" rust, , async ,"), vec!["rust", "async"]);
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a b@c.d"));
        assert!(!looks_like_email("nobody"));
        assert!(!looks_like_email("x@localhost"));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User::new("Viewer", "viewer@example.com", "secret-hash".into());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"_id\""));
    }
}
