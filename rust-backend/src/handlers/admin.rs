use std::collections::HashMap;

use actix_web::{delete, get, patch, web, HttpResponse};
use chrono::{Duration, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{parse_id, AppError};
use crate::feed;
use crate::handlers::videos::remove_video;
use crate::media::delete_quietly;
use crate::models::{OwnerSummary, Report, ReportStatus, ReportStatusRequest, ReportTarget};
use crate::store::{Page, PageParams, Store, StoreResult, VideoFilter, VideoQuery, VideoSort};
use crate::AppState;

pub const ADMIN_PAGE_SIZE: u64 = 20;
const RECENT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportListParams {
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Serialize)]
struct ReportView {
    #[serde(flatten)]
    report: Report,
    reporter: OwnerSummary,
    /// Video title or comment text; `null` once the target is gone.
    subject: Option<String>,
}

fn page_of(page: &Option<String>, limit: &Option<String>) -> Page {
    Page::from_params(
        &PageParams {
            page: page.clone(),
            limit: limit.clone(),
        },
        ADMIN_PAGE_SIZE,
    )
}

async fn report_subjects(store: &dyn Store, reports: &[Report]) -> StoreResult<HashMap<Uuid, String>> {
    let mut subjects = HashMap::new();
    let video_ids: Vec<Uuid> = reports
        .iter()
        .filter_map(|r| match r.target {
            ReportTarget::Video(id) => Some(id),
            ReportTarget::Comment(_) => None,
        })
        .collect();
    if !video_ids.is_empty() {
        let filter = VideoFilter {
            ids: Some(video_ids.clone()),
            ..VideoFilter::default()
        };
        let videos = store
            .find_videos(&VideoQuery::new(filter, VideoSort::Newest, video_ids.len() as u64))
            .await?;
        subjects.extend(videos.into_iter().map(|v| (v.id, v.title)));
    }
    for report in reports {
        if let ReportTarget::Comment(id) = report.target {
            if subjects.contains_key(&id) {
                continue;
            }
            if let Some(comment) = store.find_comment(id).await? {
                subjects.insert(id, comment.text);
            }
        }
    }
    Ok(subjects)
}

/// `None` means every status.
fn status_filter(raw: Option<&str>) -> Result<Option<ReportStatus>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Some(ReportStatus::Pending)),
        Some("all") => Ok(None),
        Some(other) => other.parse().map(Some).map_err(AppError::BadRequest),
    }
}

async fn platform_stats(state: &AppState) -> Result<HttpResponse, AppError> {
    let since = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);
    let platform = state.store.stats(since).await?;
    Ok(HttpResponse::Ok().json(platform))
}

#[get("/api/admin/stats")]
async fn stats(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
    platform_stats(&state).await
}

#[get("/api/admin/dashboard")]
async fn dashboard(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
    platform_stats(&state).await
}

#[get("/api/admin/users")]
async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
    params: web::Query<UserListParams>,
) -> Result<HttpResponse, AppError> {
    let page = page_of(&params.page, &params.limit);
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let (users, total) = state.store.list_users(search, page).await?;
    Ok(HttpResponse::Ok().json(json!({
        "users": users,
        "page": page.number,
        "pages": page.pages_for(total),
        "total": total,
    })))
}

#[delete("/api/admin/users/{id}")]
async fn delete_user(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if user.is_admin() {
        return Err(AppError::bad_request("Cannot delete admin user"));
    }

    let videos = state.store.delete_videos_by_owner(user.id).await?;
    for video in &videos {
        delete_quietly(
            state.media.as_ref(),
            &[video.video_public_id.as_str(), video.thumbnail_public_id.as_str()],
        )
        .await;
        state.store.delete_comments_for_video(video.id).await?;
    }
    let comments = state.store.delete_comments_by_user(user.id).await?;
    state.store.delete_user(user.id).await?;
    info!(
        "Admin {} deleted user {} with {} videos and {} comments",
        admin.id,
        user.id,
        videos.len(),
        comments
    );

    Ok(HttpResponse::Ok().json(json!({ "message": "User and associated content deleted" })))
}

#[get("/api/admin/reports")]
async fn list_reports(
    state: web::Data<AppState>,
    _admin: AdminUser,
    params: web::Query<ReportListParams>,
) -> Result<HttpResponse, AppError> {
    let status = status_filter(params.status.as_deref())?;
    let page = page_of(&params.page, &params.limit);
    let (reports, total) = state.store.list_reports(status, page).await?;

    let mut reporter_ids: Vec<Uuid> = reports.iter().map(|r| r.reporter_id).collect();
    reporter_ids.sort();
    reporter_ids.dedup();
    let reporters: HashMap<Uuid, OwnerSummary> = if reporter_ids.is_empty() {
        HashMap::new()
    } else {
        state
            .store
            .find_users(&reporter_ids)
            .await?
            .iter()
            .map(|u| (u.id, u.owner_summary()))
            .collect()
    };
    let subjects = report_subjects(state.store.as_ref(), &reports).await?;
    let views: Vec<ReportView> = reports
        .into_iter()
        .map(|report| {
            let reporter = reporters
                .get(&report.reporter_id)
                .cloned()
                .unwrap_or_else(|| OwnerSummary::deleted(report.reporter_id));
            let subject = subjects.get(&report.target.id()).cloned();
            ReportView {
                report,
                reporter,
                subject,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "reports": views,
        "page": page.number,
        "pages": page.pages_for(total),
        "total": total,
    })))
}

#[patch("/api/admin/reports/{id}")]
async fn update_report(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    path: web::Path<String>,
    req: web::Json<ReportStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let next: ReportStatus = req.status.trim().parse().map_err(AppError::BadRequest)?;
    let mut report = state
        .store
        .find_report(id)
        .await?
        .ok_or_else(|| AppError::not_found("Report not found"))?;
    if !report.status.can_become(next) {
        return Err(AppError::bad_request(format!(
            "Report cannot move from {} to {}",
            report.status.as_str(),
            next.as_str()
        )));
    }

    report.status = next;
    report.updated_at = Utc::now();
    state.store.update_report(&report).await?;
    info!("Admin {} marked report {} as {}", admin.id, report.id, next.as_str());
    Ok(HttpResponse::Ok().json(json!({ "report": report })))
}

#[get("/api/admin/videos")]
async fn list_videos(
    state: web::Data<AppState>,
    _admin: AdminUser,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let page = Page::from_params(&params, ADMIN_PAGE_SIZE);
    let videos = feed::list_videos(state.store.as_ref(), VideoFilter::default(), VideoSort::Newest, page).await?;
    Ok(HttpResponse::Ok().json(videos.into_json("videos")))
}

#[delete("/api/admin/videos/{id}")]
async fn delete_video(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let video = state
        .store
        .find_video(id)
        .await?
        .ok_or_else(|| AppError::not_found("Video not found"))?;
    remove_video(&state, &video).await?;
    info!("Admin {} removed video {}", admin.id, video.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Video deleted successfully" })))
}
