#![allow(dead_code)]

use std::sync::Arc;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use zentube_backend::config::Config;
use zentube_backend::handlers;
use zentube_backend::media::MemoryMediaStore;
use zentube_backend::models::{Category, Role, Video};
use zentube_backend::store::{MemoryStore, Store};
use zentube_backend::AppState;

pub const BOUNDARY: &str = "----zentube-test-boundary";

/// Handles the tests keep next to the service: the shared state and the concrete media store.
pub struct TestContext {
    pub state: web::Data<AppState>,
    pub media: Arc<MemoryMediaStore>,
}

impl TestContext {
    pub fn store(&self) -> &dyn Store {
        self.state.store.as_ref()
    }

    pub async fn promote_to_admin(&self, id: Uuid) {
        let mut user = self.store().find_user(id).await.unwrap().unwrap();
        user.role = Role::Admin;
        self.store().update_user(&user).await.unwrap();
    }

    /// Inserts a published video directly, bypassing the upload route.
    pub async fn seed_video(&self, owner: Uuid, title: &str, category: Category, views: i64) -> Video {
        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            video_url: String::new(),
            video_public_id: String::new(),
            thumbnail: String::new(),
            thumbnail_public_id: String::new(),
            duration: 60.0,
            category,
            tags: Vec::new(),
            owner_id: owner,
            views,
            likes: Vec::new(),
            dislikes: Vec::new(),
            is_short: false,
            is_published: true,
            is_reported: false,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.store().insert_video(&video).await.unwrap();
        video
    }
}

pub async fn setup_test_app() -> (
    impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    TestContext,
) {
    let _ = env_logger::builder().is_test(true).try_init();

    let media = Arc::new(MemoryMediaStore::new());
    let state = web::Data::new(AppState::new(
        Arc::new(MemoryStore::new()),
        media.clone(),
        Config::in_memory(),
    ));

    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(handlers::configure_routes),
    )
    .await;
    (app, TestContext { state, media })
}

/// Registers a fresh account and returns `(user id, bearer token)`.
pub async fn register_user(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    name: &str,
) -> (Uuid, String) {
    let unique_id = Uuid::new_v4().to_string();
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": name,
            "email": format!("{}_{}@example.com", name.to_lowercase(), &unique_id[..8]),
            "password": "password123",
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status().as_u16(), 201);
    let body: Value = test::read_body_json(resp).await;
    let id = body["user"]["_id"].as_str().unwrap().parse().unwrap();
    (id, body["token"].as_str().unwrap().to_string())
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Encodes `parts` as a `multipart/form-data` body. Returns the content type header and the body.
pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
