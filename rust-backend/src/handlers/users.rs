use std::collections::HashMap;

use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use log::info;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{AuthUser, OptionalUser};
use crate::error::{parse_id, AppError};
use crate::feed::{self, FeedParams, FEED_PAGE_SIZE};
use crate::models::VideoView;
use crate::store::{Page, PageParams, Store, StoreResult, VideoFilter, VideoQuery, VideoSort};
use crate::AppState;

/// Entries returned by `GET /api/users/history`.
const HISTORY_PAGE_SIZE: usize = 50;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry {
    video: VideoView,
    watched_at: chrono::DateTime<Utc>,
}

/// Resolves `ids` to videos, keeping the given order and dropping ids that no longer exist.
async fn videos_in_order(store: &dyn Store, ids: &[Uuid]) -> StoreResult<Vec<VideoView>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let filter = VideoFilter {
        ids: Some(ids.to_vec()),
        ..VideoFilter::default()
    };
    let found = store
        .find_videos(&VideoQuery::new(filter, VideoSort::Newest, ids.len() as u64))
        .await?;
    let mut by_id: HashMap<Uuid, VideoView> = feed::with_owners(store, found)
        .await?
        .into_iter()
        .map(|view| (view.video.id, view))
        .collect();
    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

async fn ensure_video_exists(state: &AppState, raw_id: &str) -> Result<Uuid, AppError> {
    let id = parse_id(raw_id)?;
    match state.store.find_video(id).await? {
        Some(_) => Ok(id),
        None => Err(AppError::not_found("Video not found")),
    }
}

#[get("/api/users/history")]
async fn get_history(state: web::Data<AppState>, AuthUser(user): AuthUser) -> Result<HttpResponse, AppError> {
    let mut entries = user.watch_history.clone();
    entries.sort_by(|a, b| b.watched_at.cmp(&a.watched_at));
    let ids: Vec<Uuid> = entries.iter().map(|e| e.video).collect();
    let mut videos: HashMap<Uuid, VideoView> = videos_in_order(state.store.as_ref(), &ids)
        .await?
        .into_iter()
        .map(|view| (view.video.id, view))
        .collect();

    let history: Vec<HistoryEntry> = entries
        .into_iter()
        .filter_map(|entry| {
            videos.remove(&entry.video).map(|video| HistoryEntry {
                video,
                watched_at: entry.watched_at,
            })
        })
        .take(HISTORY_PAGE_SIZE)
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "history": history })))
}

#[post("/api/users/history/{video_id}")]
async fn add_to_history(
    state: web::Data<AppState>,
    AuthUser(mut user): AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let video_id = ensure_video_exists(&state, &path).await?;
    user.record_watch(video_id, Utc::now());
    user.updated_at = Utc::now();
    state.store.update_user(&user).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Added to watch history" })))
}

#[get("/api/users/watchlater")]
async fn get_watch_later(state: web::Data<AppState>, AuthUser(user): AuthUser) -> Result<HttpResponse, AppError> {
    let videos = videos_in_order(state.store.as_ref(), &user.watch_later).await?;
    Ok(HttpResponse::Ok().json(json!({ "videos": videos })))
}

#[post("/api/users/watchlater/{video_id}")]
async fn toggle_watch_later(
    state: web::Data<AppState>,
    AuthUser(mut user): AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let video_id = ensure_video_exists(&state, &path).await?;
    let saved = user.toggle_watch_later(video_id);
    user.updated_at = Utc::now();
    state.store.update_user(&user).await?;
    Ok(HttpResponse::Ok().json(json!({ "isSaved": saved, "watchLater": user.watch_later })))
}

#[get("/api/users/subscriptions/feed")]
async fn subscription_feed(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let page = Page::from_params(&params, FEED_PAGE_SIZE);
    let feed = feed::subscription_feed(state.store.as_ref(), &user, page).await?;
    Ok(HttpResponse::Ok().json(feed.into_json("videos")))
}

#[get("/api/users/{id}")]
async fn get_profile(
    state: web::Data<AppState>,
    OptionalUser(viewer): OptionalUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let published = VideoFilter {
        published: Some(true),
        owner: Some(user.id),
        ..VideoFilter::default()
    };
    let channel = [user.id];
    let (video_count, counts) = futures::try_join!(
        state.store.count_videos(&published),
        state.store.subscriber_counts(&channel)
    )?;
    let is_subscribed = match &viewer {
        Some(viewer) if viewer.id != user.id => state.store.is_subscribed(viewer.id, user.id).await?,
        _ => false,
    };

    Ok(HttpResponse::Ok().json(json!({
        "user": {
            "_id": user.id,
            "name": user.name,
            "avatar": user.avatar,
            "banner": user.banner,
            "bio": user.bio,
            "channelName": user.channel_name,
            "subscriberCount": counts.get(&user.id).copied().unwrap_or(0),
            "videoCount": video_count,
            "createdAt": user.created_at,
            "isMonetized": user.is_monetized,
            "isSubscribed": is_subscribed,
        }
    })))
}

#[get("/api/users/{id}/videos")]
async fn get_user_videos(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<FeedParams>,
) -> Result<HttpResponse, AppError> {
    let owner = parse_id(&path)?;
    let sort = VideoSort::from_param(params.sort.as_deref());
    let page = Page::from_params(&params.page_params(), FEED_PAGE_SIZE);
    let videos = feed::channel_videos(state.store.as_ref(), owner, sort, page).await?;
    Ok(HttpResponse::Ok().json(videos.into_json("videos")))
}

#[post("/api/users/{id}/subscribe")]
async fn toggle_subscribe(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let channel_id = parse_id(&path)?;
    if channel_id == user.id {
        return Err(AppError::bad_request("You cannot subscribe to yourself"));
    }
    if state.store.find_user(channel_id).await?.is_none() {
        return Err(AppError::not_found("Channel not found"));
    }

    let subscribed = !state.store.is_subscribed(user.id, channel_id).await?;
    state.store.set_subscription(user.id, channel_id, subscribed).await?;
    let counts = state.store.subscriber_counts(&[channel_id]).await?;
    info!(
        "User {} {} channel {}",
        user.id,
        if subscribed { "subscribed to" } else { "unsubscribed from" },
        channel_id
    );

    Ok(HttpResponse::Ok().json(json!({
        "isSubscribed": subscribed,
        "subscriberCount": counts.get(&channel_id).copied().unwrap_or(0),
    })))
}
