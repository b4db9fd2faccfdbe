use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{AuthUser, OptionalUser};
use crate::error::{parse_id, AppError};
use crate::feed::{self, FeedParams, TRENDING_LIMIT};
use crate::handlers::file_report;
use crate::media::delete_quietly;
use crate::models::{
    parse_tags, Category, ReportRequest, ReportTarget, User, Video, DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS,
};
use crate::recommend::recommend;
use crate::store::PageParams;
use crate::upload::UploadForm;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<String>,
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(AppError::bad_request(format!(
            "Title must be less than {} characters",
            TITLE_MAX_CHARS
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(AppError::bad_request(format!(
            "Description must be less than {} characters",
            DESCRIPTION_MAX_CHARS
        )));
    }
    Ok(())
}

fn parse_category(raw: &str) -> Result<Category, AppError> {
    raw.trim().parse().map_err(AppError::BadRequest)
}

async fn load_video(state: &AppState, raw_id: &str) -> Result<Video, AppError> {
    let id = parse_id(raw_id)?;
    state
        .store
        .find_video(id)
        .await?
        .ok_or_else(|| AppError::not_found("Video not found"))
}

fn ensure_can_modify(video: &Video, user: &User) -> Result<(), AppError> {
    if video.is_owned_by(user) || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Not authorized"))
    }
}

/// Deletes a video, its stored media and its comments. Watch lists keep dangling ids.
pub(crate) async fn remove_video(state: &AppState, video: &Video) -> Result<(), AppError> {
    delete_quietly(
        state.media.as_ref(),
        &[video.video_public_id.as_str(), video.thumbnail_public_id.as_str()],
    )
    .await;
    let comments = state.store.delete_comments_for_video(video.id).await?;
    state.store.delete_video(video.id).await?;
    info!("Deleted video {} and {} comments", video.id, comments);
    Ok(())
}

#[get("/api/videos")]
async fn get_videos(
    state: web::Data<AppState>,
    OptionalUser(viewer): OptionalUser,
    params: web::Query<FeedParams>,
) -> Result<HttpResponse, AppError> {
    let page = feed::home_feed(state.store.as_ref(), &params, viewer.as_ref()).await?;
    Ok(HttpResponse::Ok().json(page.into_json("videos")))
}

#[get("/api/videos/shorts")]
async fn get_shorts(state: web::Data<AppState>, params: web::Query<PageParams>) -> Result<HttpResponse, AppError> {
    let page = feed::shorts(state.store.as_ref(), &params).await?;
    Ok(HttpResponse::Ok().json(page.into_json("videos")))
}

#[get("/api/videos/trending")]
async fn get_trending(state: web::Data<AppState>, params: web::Query<LimitParams>) -> Result<HttpResponse, AppError> {
    let limit = params
        .limit
        .as_deref()
        .and_then(|l| l.trim().parse::<i64>().ok())
        .filter(|l| *l >= 1)
        .map_or(TRENDING_LIMIT, |l| l as u64);
    let videos = feed::trending(state.store.as_ref(), limit).await?;
    Ok(HttpResponse::Ok().json(json!({ "videos": videos })))
}

#[get("/api/videos/{id}")]
async fn get_video(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let video = state
        .store
        .increment_views(id)
        .await?
        .ok_or_else(|| AppError::not_found("Video not found"))?;
    let view = feed::watch_view(state.store.as_ref(), video).await?;
    Ok(HttpResponse::Ok().json(json!({ "video": view })))
}

#[get("/api/videos/{id}/recommended")]
async fn get_recommended(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let videos = recommend(state.store.as_ref(), id).await?;
    Ok(HttpResponse::Ok().json(json!({ "videos": videos })))
}

#[post("/api/videos")]
async fn upload_video(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut form = UploadForm::read(payload, state.config.max_upload_bytes).await?;

    let (title, category) = match (form.trimmed("title"), form.trimmed("category")) {
        (Some(title), Some(category)) => (title.to_string(), category.to_string()),
        _ => return Err(AppError::bad_request("Title and category are required")),
    };
    validate_title(&title)?;
    let category = parse_category(&category)?;
    let description = form.text("description").unwrap_or_default().trim().to_string();
    validate_description(&description)?;
    let video_file = form
        .take_file("video")
        .ok_or_else(|| AppError::bad_request("Video file is required"))?
        .expect_kind("video", "video")?;
    let thumbnail_file = match form.take_file("thumbnail") {
        Some(file) => Some(file.expect_kind("image", "thumbnail")?),
        None => None,
    };
    let duration = form
        .trimmed("duration")
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let video_asset = state
        .media
        .put("videos", &video_file.file_name, &video_file.content_type, video_file.data)
        .await?;
    let thumbnail_asset = match thumbnail_file {
        Some(file) => match state
            .media
            .put("thumbnails", &file.file_name, &file.content_type, file.data)
            .await
        {
            Ok(asset) => Some(asset),
            Err(e) => {
                delete_quietly(state.media.as_ref(), &[video_asset.public_id.as_str()]).await;
                return Err(e.into());
            }
        },
        None => None,
    };

    let now = Utc::now();
    let (thumbnail, thumbnail_public_id) = thumbnail_asset
        .map(|asset| (asset.url, asset.public_id))
        .unwrap_or_default();
    let video = Video {
        id: Uuid::new_v4(),
        title,
        description,
        video_url: video_asset.url,
        video_public_id: video_asset.public_id,
        thumbnail,
        thumbnail_public_id,
        duration,
        category,
        tags: form.text("tags").map(parse_tags).unwrap_or_default(),
        owner_id: user.id,
        views: 0,
        likes: Vec::new(),
        dislikes: Vec::new(),
        is_short: form.flag("isShort").unwrap_or(false),
        is_published: true,
        is_reported: false,
        comment_count: 0,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = state.store.insert_video(&video).await {
        error!("Failed to save uploaded video {}: {}", video.id, e);
        delete_quietly(
            state.media.as_ref(),
            &[video.video_public_id.as_str(), video.thumbnail_public_id.as_str()],
        )
        .await;
        return Err(e.into());
    }
    info!("User {} uploaded video {} ({})", user.id, video.id, video.category);

    let mut views = feed::with_owners(state.store.as_ref(), vec![video]).await?;
    Ok(HttpResponse::Created().json(json!({ "video": views.remove(0) })))
}

#[put("/api/videos/{id}")]
async fn update_video(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut video = load_video(&state, &path).await?;
    ensure_can_modify(&video, &user)?;
    let mut form = UploadForm::read(payload, state.config.max_upload_bytes).await?;

    if let Some(title) = form.trimmed("title") {
        validate_title(title)?;
        video.title = title.to_string();
    }
    if let Some(description) = form.text("description") {
        let description = description.trim();
        validate_description(description)?;
        video.description = description.to_string();
    }
    if let Some(category) = form.trimmed("category") {
        video.category = parse_category(category)?;
    }
    if let Some(tags) = form.trimmed("tags") {
        video.tags = parse_tags(tags);
    }
    if let Some(published) = form.flag("isPublished") {
        video.is_published = published;
    }

    let mut stale_thumbnail = None;
    if let Some(file) = form.take_file("thumbnail") {
        let file = file.expect_kind("image", "thumbnail")?;
        let asset = state
            .media
            .put("thumbnails", &file.file_name, &file.content_type, file.data)
            .await?;
        video.thumbnail = asset.url;
        stale_thumbnail = Some(std::mem::replace(&mut video.thumbnail_public_id, asset.public_id));
    }

    video.updated_at = Utc::now();
    if !state.store.update_video(&video).await? {
        return Err(AppError::not_found("Video not found"));
    }
    if let Some(old) = stale_thumbnail {
        delete_quietly(state.media.as_ref(), &[old.as_str()]).await;
    }
    info!("User {} updated video {}", user.id, video.id);

    let mut views = feed::with_owners(state.store.as_ref(), vec![video]).await?;
    Ok(HttpResponse::Ok().json(json!({ "video": views.remove(0) })))
}

#[delete("/api/videos/{id}")]
async fn delete_video(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let video = load_video(&state, &path).await?;
    ensure_can_modify(&video, &user)?;
    remove_video(&state, &video).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Video deleted successfully" })))
}

#[post("/api/videos/{id}/like")]
async fn like_video(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let mut video = load_video(&state, &path).await?;
    let reaction = video.toggle_like(user.id);
    state.store.update_video(&video).await?;
    Ok(HttpResponse::Ok().json(reaction))
}

#[post("/api/videos/{id}/dislike")]
async fn dislike_video(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let mut video = load_video(&state, &path).await?;
    let reaction = video.toggle_dislike(user.id);
    state.store.update_video(&video).await?;
    Ok(HttpResponse::Ok().json(reaction))
}

#[post("/api/videos/{id}/report")]
async fn report_video(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<String>,
    req: web::Json<ReportRequest>,
) -> Result<HttpResponse, AppError> {
    let mut video = load_video(&state, &path).await?;
    file_report(&state, &user, ReportTarget::Video(video.id), req.into_inner()).await?;

    if !video.is_reported {
        video.is_reported = true;
        state.store.update_video(&video).await?;
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Video reported successfully" })))
}
