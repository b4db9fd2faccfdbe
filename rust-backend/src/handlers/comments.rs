use std::collections::HashMap;

use actix_web::{delete, get, post, web, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{parse_id, AppError};
use crate::handlers::file_report;
use crate::models::{Comment, CommentRequest, CommentView, OwnerSummary, ReportRequest, ReportTarget, COMMENT_MAX_CHARS};
use crate::store::{Page, PageParams, Paginated, Store, StoreResult};
use crate::AppState;

pub const COMMENT_PAGE_SIZE: u64 = 20;

async fn load_comment(state: &AppState, raw_id: &str) -> Result<Comment, AppError> {
    let id = parse_id(raw_id)?;
    state
        .store
        .find_comment(id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))
}

async fn authors(store: &dyn Store, comments: &[&Comment]) -> StoreResult<HashMap<Uuid, OwnerSummary>> {
    let mut ids: Vec<Uuid> = comments.iter().map(|c| c.user_id).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(store
        .find_users(&ids)
        .await?
        .iter()
        .map(|u| (u.id, u.owner_summary()))
        .collect())
}

fn view(comment: Comment, authors: &HashMap<Uuid, OwnerSummary>, replies: Option<Vec<CommentView>>) -> CommentView {
    let user = authors
        .get(&comment.user_id)
        .cloned()
        .unwrap_or_else(|| OwnerSummary::deleted(comment.user_id));
    CommentView { comment, user, replies }
}

/// One page of top-level comments, newest first, each carrying its replies oldest first.
pub async fn comment_thread(store: &dyn Store, video: Uuid, page: Page) -> StoreResult<Paginated<CommentView>> {
    let (top, total) = store.top_level_comments(video, page).await?;
    let parent_ids: Vec<Uuid> = top.iter().map(|c| c.id).collect();
    let replies = if parent_ids.is_empty() {
        Vec::new()
    } else {
        store.replies_to(&parent_ids).await?
    };
    let everyone: Vec<&Comment> = top.iter().chain(replies.iter()).collect();
    let authors = authors(store, &everyone).await?;

    let mut by_parent: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
    for reply in replies {
        if let Some(parent) = reply.parent_comment {
            by_parent.entry(parent).or_default().push(view(reply, &authors, None));
        }
    }
    let views = top
        .into_iter()
        .map(|c| {
            let replies = by_parent.remove(&c.id).unwrap_or_default();
            view(c, &authors, Some(replies))
        })
        .collect();
    Ok(Paginated::new(views, page, total))
}

#[get("/api/comments/{video_id}")]
async fn get_comments(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let video_id = parse_id(&path)?;
    let page = Page::from_params(&params, COMMENT_PAGE_SIZE);
    let thread = comment_thread(state.store.as_ref(), video_id, page).await?;
    Ok(HttpResponse::Ok().json(thread.into_json("comments")))
}

#[post("/api/comments/{video_id}")]
async fn add_comment(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<String>,
    req: web::Json<CommentRequest>,
) -> Result<HttpResponse, AppError> {
    let video_id = parse_id(&path)?;
    let req = req.into_inner();
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::bad_request("Comment text is required"));
    }
    if text.chars().count() > COMMENT_MAX_CHARS {
        return Err(AppError::bad_request(format!(
            "Comment must be less than {} characters",
            COMMENT_MAX_CHARS
        )));
    }
    if state.store.find_video(video_id).await?.is_none() {
        return Err(AppError::not_found("Video not found"));
    }
    if let Some(parent_id) = req.parent_comment {
        match state.store.find_comment(parent_id).await? {
            Some(parent) if parent.video_id == video_id && !parent.is_reply() => {}
            Some(parent) if parent.is_reply() => {
                return Err(AppError::bad_request("Cannot reply to a reply"));
            }
            _ => return Err(AppError::bad_request("Parent comment not found on this video")),
        }
    }

    let comment = Comment::new(text, user.id, video_id, req.parent_comment);
    state.store.insert_comment(&comment).await?;
    if let Err(e) = state.store.adjust_comment_count(video_id, 1).await {
        warn!("Comment count of video {} not incremented: {}", video_id, e);
    }
    info!("User {} commented on video {}", user.id, video_id);

    let view = CommentView {
        comment,
        user: user.owner_summary(),
        replies: None,
    };
    Ok(HttpResponse::Created().json(json!({ "comment": view })))
}

#[delete("/api/comments/{id}")]
async fn delete_comment(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let comment = load_comment(&state, &path).await?;
    if comment.user_id != user.id && !user.is_admin() {
        return Err(AppError::forbidden("Not authorized"));
    }

    let replies = state.store.delete_replies(comment.id).await?;
    state.store.delete_comment(comment.id).await?;
    let removed = 1 + replies as i64;
    if let Err(e) = state.store.adjust_comment_count(comment.video_id, -removed).await {
        warn!("Comment count of video {} not decremented: {}", comment.video_id, e);
    }
    info!("User {} deleted comment {} with {} replies", user.id, comment.id, replies);
    Ok(HttpResponse::Ok().json(json!({ "message": "Comment deleted" })))
}

#[post("/api/comments/{id}/like")]
async fn like_comment(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let mut comment = load_comment(&state, &path).await?;
    let liked = comment.toggle_like(user.id);
    comment.updated_at = Utc::now();
    state.store.update_comment(&comment).await?;
    Ok(HttpResponse::Ok().json(json!({ "likes": comment.likes.len(), "isLiked": liked })))
}

#[post("/api/comments/{id}/report")]
async fn report_comment(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<String>,
    req: web::Json<ReportRequest>,
) -> Result<HttpResponse, AppError> {
    let comment = load_comment(&state, &path).await?;
    file_report(&state, &user, ReportTarget::Comment(comment.id), req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Comment reported successfully" })))
}
