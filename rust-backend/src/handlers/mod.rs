use actix_web::{get, web, Responder};
use log::info;
use serde_json::json;

use crate::error::{json_error_handler, AppError};
use crate::models::{Report, ReportReason, ReportRequest, ReportTarget, User, REPORT_DESCRIPTION_MAX_CHARS};
use crate::AppState;

pub mod admin;
pub mod auth;
pub mod comments;
pub mod media;
pub mod search;
pub mod users;
pub mod videos;

#[get("/api/status")]
async fn status() -> impl Responder {
    web::Json(json!({ "status": "ok" }))
}

/// Files a pending report unless `reporter` already has one open against `target`.
pub(crate) async fn file_report(
    state: &AppState,
    reporter: &User,
    target: ReportTarget,
    req: ReportRequest,
) -> Result<Report, AppError> {
    let reason: ReportReason = req
        .reason
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request("Please provide a valid report reason"))?;
    let description = req.description.unwrap_or_default().trim().to_string();
    if description.chars().count() > REPORT_DESCRIPTION_MAX_CHARS {
        return Err(AppError::bad_request(format!(
            "Description must be less than {} characters",
            REPORT_DESCRIPTION_MAX_CHARS
        )));
    }
    if state.store.find_pending_report(reporter.id, target).await?.is_some() {
        return Err(AppError::bad_request(format!(
            "You have already reported this {}",
            target.kind()
        )));
    }

    let report = Report::new(reporter.id, target, reason, description);
    state.store.insert_report(&report).await?;
    info!(
        "User {} reported {} {} for {}",
        reporter.id,
        target.kind(),
        target.id(),
        reason.as_str()
    );
    Ok(report)
}

/// Fixed paths are registered before the `{id}` routes that would otherwise capture them.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(status)
        .service(auth::register)
        .service(auth::login)
        .service(auth::me)
        .service(auth::update_profile)
        .service(videos::get_videos)
        .service(videos::get_shorts)
        .service(videos::get_trending)
        .service(videos::upload_video)
        .service(videos::get_video)
        .service(videos::get_recommended)
        .service(videos::update_video)
        .service(videos::delete_video)
        .service(videos::like_video)
        .service(videos::dislike_video)
        .service(videos::report_video)
        .service(users::get_history)
        .service(users::add_to_history)
        .service(users::get_watch_later)
        .service(users::toggle_watch_later)
        .service(users::subscription_feed)
        .service(users::get_profile)
        .service(users::get_user_videos)
        .service(users::toggle_subscribe)
        .service(comments::get_comments)
        .service(comments::add_comment)
        .service(comments::delete_comment)
        .service(comments::like_comment)
        .service(comments::report_comment)
        .service(search::search_all)
        .service(admin::stats)
        .service(admin::dashboard)
        .service(admin::list_users)
        .service(admin::delete_user)
        .service(admin::list_reports)
        .service(admin::update_report)
        .service(admin::list_videos)
        .service(admin::delete_video)
        .service(media::get_media);
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    use super::*;

    #[actix_web::test]
    async fn status_route_answers_ok() {
        let app = test::init_service(App::new().service(status)).await;
        let req = test::TestRequest::get().uri("/api/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
    }
}
