use actix_web::test;
use serde_json::{json, Value};
use uuid::Uuid;

mod common;
use common::{bearer, register_user, setup_test_app};
use zentube_backend::models::Category;

async fn post_comment(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    token: &str,
    video: Uuid,
    payload: Value,
) -> Value {
    let req = test::TestRequest::post()
        .uri(&format!("/api/comments/{}", video))
        .insert_header(bearer(token))
        .set_json(payload)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status().as_u16(), 201);
    test::read_body_json(resp).await
}

#[actix_web::test]
async fn test_comment_thread_and_counts() {
    let (app, ctx) = setup_test_app().await;
    let (owner, owner_token) = register_user(&app, "Creator").await;
    let (_, viewer_token) = register_user(&app, "Viewer").await;
    let video = ctx.seed_video(owner, "Discussed", Category::Education, 0).await;

    let top = post_comment(&app, &viewer_token, video.id, json!({ "text": "  Great video!  " })).await;
    assert_eq!(top["comment"]["text"], "Great video!");
    assert_eq!(top["comment"]["user"]["name"], "Viewer");
    let top_id = top["comment"]["_id"].as_str().unwrap().to_string();

    for text in ["Thanks!", "Glad you liked it"] {
        post_comment(
            &app,
            &owner_token,
            video.id,
            json!({ "text": text, "parentComment": top_id }),
        )
        .await;
    }
    assert_eq!(ctx.store().find_video(video.id).await.unwrap().unwrap().comment_count, 3);

    let req = test::TestRequest::get().uri(&format!("/api/comments/{}", video.id)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    let replies = body["comments"][0]["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["user"]["name"], "Creator");

    // deleting the parent takes both replies with it
    let req = test::TestRequest::delete()
        .uri(&format!("/api/comments/{}", top_id))
        .insert_header(bearer(&viewer_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Comment deleted");
    assert_eq!(ctx.store().find_video(video.id).await.unwrap().unwrap().comment_count, 0);

    let req = test::TestRequest::get().uri(&format!("/api/comments/{}", video.id)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 0);
}

#[actix_web::test]
async fn test_comment_validation() {
    let (app, ctx) = setup_test_app().await;
    let (owner, token) = register_user(&app, "Creator").await;
    let video = ctx.seed_video(owner, "Quiet", Category::News, 0).await;
    let other = ctx.seed_video(owner, "Elsewhere", Category::News, 0).await;

    let send = |target: Uuid, payload: Value| {
        test::TestRequest::post()
            .uri(&format!("/api/comments/{}", target))
            .insert_header(bearer(&token))
            .set_json(payload)
            .to_request()
    };

    let resp = test::call_service(&app, send(video.id, json!({ "text": "   " }))).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Comment text is required");

    let resp = test::call_service(&app, send(Uuid::new_v4(), json!({ "text": "hello" }))).await;
    assert_eq!(resp.status().as_u16(), 404);

    let too_long = "x".repeat(1001);
    let resp = test::call_service(&app, send(video.id, json!({ "text": too_long }))).await;
    assert_eq!(resp.status().as_u16(), 400);

    // a parent from another video is rejected
    let parent = post_comment(&app, &token, other.id, json!({ "text": "over here" })).await;
    let parent_id = parent["comment"]["_id"].as_str().unwrap();
    let resp = test::call_service(&app, send(video.id, json!({ "text": "reply", "parentComment": parent_id }))).await;
    assert_eq!(resp.status().as_u16(), 400);

    // replies cannot be nested
    let reply = post_comment(&app, &token, other.id, json!({ "text": "reply", "parentComment": parent_id })).await;
    let reply_id = reply["comment"]["_id"].as_str().unwrap();
    let resp = test::call_service(&app, send(other.id, json!({ "text": "deeper", "parentComment": reply_id }))).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn test_comment_permissions_likes_and_reports() {
    let (app, ctx) = setup_test_app().await;
    let (owner, owner_token) = register_user(&app, "Creator").await;
    let (_, fan_token) = register_user(&app, "Fan").await;
    let video = ctx.seed_video(owner, "Popular", Category::Music, 0).await;

    let comment = post_comment(&app, &owner_token, video.id, json!({ "text": "Pinned note" })).await;
    let id = comment["comment"]["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/comments/{}", id))
        .insert_header(bearer(&fan_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 403);

    for expected in [json!({ "likes": 1, "isLiked": true }), json!({ "likes": 0, "isLiked": false })] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/comments/{}/like", id))
            .insert_header(bearer(&fan_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, expected);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/api/comments/{}/report", id))
        .insert_header(bearer(&fan_token))
        .set_json(json!({ "reason": "harassment", "description": "rude" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Comment reported successfully");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/comments/{}", Uuid::new_v4()))
        .insert_header(bearer(&owner_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Comment not found");
}
