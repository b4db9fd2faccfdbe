use actix_web::test;
use serde_json::{json, Value};

mod common;
use common::{bearer, register_user, setup_test_app};
use zentube_backend::models::{Category, Comment, Report, ReportReason, ReportTarget};

#[actix_web::test]
async fn test_admin_routes_require_admin_role() {
    let (app, ctx) = setup_test_app().await;
    let (user, token) = register_user(&app, "Regular").await;

    let req = test::TestRequest::get().uri("/api/admin/stats").insert_header(bearer(&token)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Access denied. Admin only.");

    let req = test::TestRequest::get().uri("/api/admin/stats").to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 401);

    ctx.promote_to_admin(user).await;
    let req = test::TestRequest::get().uri("/api/admin/dashboard").insert_header(bearer(&token)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["totalUsers"], 1);
    assert_eq!(body["newUsers"], 1);
}

#[actix_web::test]
async fn test_platform_stats() {
    let (app, ctx) = setup_test_app().await;
    let (admin, token) = register_user(&app, "Admin").await;
    let (creator, _) = register_user(&app, "Creator").await;
    ctx.promote_to_admin(admin).await;
    let video = ctx.seed_video(creator, "Counted", Category::Music, 40).await;
    ctx.seed_video(creator, "Also counted", Category::Music, 2).await;
    ctx.store()
        .insert_comment(&Comment::new("hi", admin, video.id, None))
        .await
        .unwrap();

    let req = test::TestRequest::get().uri("/api/admin/stats").insert_header(bearer(&token)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body,
        json!({
            "totalUsers": 2,
            "totalVideos": 2,
            "totalComments": 1,
            "totalReports": 0,
            "pendingReports": 0,
            "newUsers": 2,
            "newVideos": 2,
            "totalViews": 42,
        })
    );
}

#[actix_web::test]
async fn test_delete_user_cascades() {
    let (app, ctx) = setup_test_app().await;
    let (admin, admin_token) = register_user(&app, "Admin").await;
    let (victim, _) = register_user(&app, "Victim").await;
    let (fan, _) = register_user(&app, "Fan").await;
    ctx.promote_to_admin(admin).await;

    let video = ctx.seed_video(victim, "Going away", Category::Vlogs, 0).await;
    let survivor = ctx.seed_video(fan, "Staying", Category::Vlogs, 0).await;
    ctx.store().insert_comment(&Comment::new("on own", fan, video.id, None)).await.unwrap();
    ctx.store()
        .insert_comment(&Comment::new("elsewhere", victim, survivor.id, None))
        .await
        .unwrap();
    ctx.store().set_subscription(fan, victim, true).await.unwrap();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/users/{}", victim))
        .insert_header(bearer(&admin_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "User and associated content deleted");

    assert!(ctx.store().find_user(victim).await.unwrap().is_none());
    assert!(ctx.store().find_video(video.id).await.unwrap().is_none());
    assert!(ctx.store().find_video(survivor.id).await.unwrap().is_some());
    assert!(ctx.store().subscriptions_of(fan).await.unwrap().is_empty());
    let stats = ctx.store().stats(chrono::Utc::now()).await.unwrap();
    assert_eq!(stats.total_comments, 0);

    // admins are protected
    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/users/{}", admin))
        .insert_header(bearer(&admin_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Cannot delete admin user");
}

#[actix_web::test]
async fn test_report_moderation() {
    let (app, ctx) = setup_test_app().await;
    let (admin, token) = register_user(&app, "Admin").await;
    let (reporter, _) = register_user(&app, "Reporter").await;
    ctx.promote_to_admin(admin).await;
    let video = ctx.seed_video(admin, "Flagged", Category::News, 0).await;
    let report = Report::new(reporter, ReportTarget::Video(video.id), ReportReason::Spam, String::new());
    ctx.store().insert_report(&report).await.unwrap();

    let req = test::TestRequest::get().uri("/api/admin/reports").insert_header(bearer(&token)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["reports"][0]["reporter"]["name"], "Reporter");
    assert_eq!(body["reports"][0]["subject"], "Flagged");
    assert_eq!(body["reports"][0]["target"]["kind"], "video");

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/reports/{}", report.id))
        .insert_header(bearer(&token))
        .set_json(json!({ "status": "resolved" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["report"]["status"], "resolved");

    // resolved reports leave the default pending listing but stay under `all`
    let req = test::TestRequest::get().uri("/api/admin/reports").insert_header(bearer(&token)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 0);
    let req = test::TestRequest::get()
        .uri("/api/admin/reports?status=all")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/reports/{}", report.id))
        .insert_header(bearer(&token))
        .set_json(json!({ "status": "pending" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
}

#[actix_web::test]
async fn test_admin_video_listing_includes_unpublished() {
    let (app, ctx) = setup_test_app().await;
    let (admin, token) = register_user(&app, "Admin").await;
    ctx.promote_to_admin(admin).await;
    let mut hidden = ctx.seed_video(admin, "Hidden", Category::Other, 0).await;
    hidden.is_published = false;
    ctx.store().update_video(&hidden).await.unwrap();
    ctx.seed_video(admin, "Visible", Category::Other, 0).await;

    let req = test::TestRequest::get().uri("/api/admin/videos").insert_header(bearer(&token)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 2);

    let req = test::TestRequest::get().uri("/api/videos").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/videos/{}", hidden.id))
        .insert_header(bearer(&token))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());
    assert!(ctx.store().find_video(hidden.id).await.unwrap().is_none());
}
