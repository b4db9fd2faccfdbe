use actix_web::test;
use serde_json::Value;
use uuid::Uuid;

mod common;
use common::{bearer, register_user, setup_test_app};
use zentube_backend::models::Category;

#[actix_web::test]
async fn test_subscribe_toggle_and_feed() {
    let (app, ctx) = setup_test_app().await;
    let (channel, _) = register_user(&app, "Channel").await;
    let (fan, fan_token) = register_user(&app, "Fan").await;
    let (other, _) = register_user(&app, "Other").await;
    ctx.seed_video(channel, "From channel", Category::Tech, 0).await;
    ctx.seed_video(other, "Not subscribed", Category::Tech, 0).await;

    let subscribe = || {
        test::TestRequest::post()
            .uri(&format!("/api/users/{}/subscribe", channel))
            .insert_header(bearer(&fan_token))
            .to_request()
    };

    let body: Value = test::call_and_read_body_json(&app, subscribe()).await;
    assert_eq!(body["isSubscribed"], true);
    assert_eq!(body["subscriberCount"], 1);
    assert_eq!(ctx.store().subscriptions_of(fan).await.unwrap(), vec![channel]);
    assert_eq!(ctx.store().subscribers_of(channel).await.unwrap(), vec![fan]);

    let req = test::TestRequest::get()
        .uri("/api/users/subscriptions/feed")
        .insert_header(bearer(&fan_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["videos"][0]["title"], "From channel");

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", channel))
        .insert_header(bearer(&fan_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user"]["subscriberCount"], 1);
    assert_eq!(body["user"]["videoCount"], 1);
    assert_eq!(body["user"]["isSubscribed"], true);
    assert!(body["user"].get("email").is_none());

    let body: Value = test::call_and_read_body_json(&app, subscribe()).await;
    assert_eq!(body["isSubscribed"], false);
    assert_eq!(body["subscriberCount"], 0);
    assert!(ctx.store().subscriptions_of(fan).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_subscribe_rejects_self_and_unknown_channel() {
    let (app, _ctx) = setup_test_app().await;
    let (me, token) = register_user(&app, "Solo").await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/subscribe", me))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "You cannot subscribe to yourself");

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/subscribe", Uuid::new_v4()))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Channel not found");
}

#[actix_web::test]
async fn test_history_is_most_recent_first_and_skips_deleted_videos() {
    let (app, ctx) = setup_test_app().await;
    let (owner, _) = register_user(&app, "Creator").await;
    let (_, token) = register_user(&app, "Viewer").await;
    let first = ctx.seed_video(owner, "First", Category::Music, 0).await;
    let second = ctx.seed_video(owner, "Second", Category::Music, 0).await;
    let doomed = ctx.seed_video(owner, "Doomed", Category::Music, 0).await;

    for video in [&first, &second, &doomed, &first] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/users/history/{}", video.id))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Added to watch history");
    }
    ctx.store().delete_video(doomed.id).await.unwrap();

    let req = test::TestRequest::get()
        .uri("/api/users/history")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let titles: Vec<&str> = body["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["video"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["First", "Second"]);

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/history/{}", Uuid::new_v4()))
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);
}

#[actix_web::test]
async fn test_watch_later_toggle() {
    let (app, ctx) = setup_test_app().await;
    let (owner, _) = register_user(&app, "Creator").await;
    let (_, token) = register_user(&app, "Viewer").await;
    let video = ctx.seed_video(owner, "Later", Category::Movies, 0).await;

    let toggle = || {
        test::TestRequest::post()
            .uri(&format!("/api/users/watchlater/{}", video.id))
            .insert_header(bearer(&token))
            .to_request()
    };

    let body: Value = test::call_and_read_body_json(&app, toggle()).await;
    assert_eq!(body["isSaved"], true);
    assert_eq!(body["watchLater"][0], video.id.to_string());

    let req = test::TestRequest::get()
        .uri("/api/users/watchlater")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["videos"][0]["title"], "Later");

    let body: Value = test::call_and_read_body_json(&app, toggle()).await;
    assert_eq!(body["isSaved"], false);
    assert_eq!(body["watchLater"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn test_channel_videos_respect_sort() {
    let (app, ctx) = setup_test_app().await;
    let (owner, _) = register_user(&app, "Creator").await;
    ctx.seed_video(owner, "Quiet", Category::Sports, 3).await;
    ctx.seed_video(owner, "Loud", Category::Sports, 300).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/videos?sort=-views", owner))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["videos"][0]["title"], "Loud");
}
