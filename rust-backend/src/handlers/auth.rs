use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;

use crate::auth::{hash_password, issue_token, verify_password, AuthUser};
use crate::error::AppError;
use crate::media::{delete_quietly, key_from_url};
use crate::models::{
    looks_like_email, LoginRequest, RegisterRequest, User, BIO_MAX_CHARS, NAME_MAX_CHARS, NAME_MIN_CHARS,
    PASSWORD_MIN_CHARS,
};
use crate::store::StoreError;
use crate::upload::UploadForm;
use crate::AppState;

pub(crate) fn validate_name(name: &str) -> Result<(), AppError> {
    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        return Err(AppError::bad_request(format!(
            "Name must be at least {} characters",
            NAME_MIN_CHARS
        )));
    }
    if len > NAME_MAX_CHARS {
        return Err(AppError::bad_request(format!(
            "Name must be less than {} characters",
            NAME_MAX_CHARS
        )));
    }
    Ok(())
}

#[post("/api/auth/register")]
async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    let name = req.name.trim();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Please provide all required fields"));
    }
    validate_name(name)?;
    if !looks_like_email(&email) {
        return Err(AppError::bad_request("Please provide a valid email"));
    }
    if req.password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(AppError::bad_request(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_CHARS
        )));
    }
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::bad_request("Email already registered"));
    }

    let hash = hash_password(req.password, state.config.bcrypt_cost).await?;
    let user = User::new(name, &email, hash);
    state.store.insert_user(&user).await.map_err(|e| match e {
        StoreError::Conflict(_) => AppError::bad_request("Email already registered"),
        other => other.into(),
    })?;
    info!("Registered user {} ({})", user.id, user.email);

    let token = issue_token(&state.config, user.id)?;
    Ok(HttpResponse::Created().json(json!({ "token": token, "user": user })))
}

#[post("/api/auth/login")]
async fn login(state: web::Data<AppState>, req: web::Json<LoginRequest>) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Please provide email and password"));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".into());
    let user = state.store.find_user_by_email(&email).await?.ok_or_else(invalid)?;
    if !verify_password(req.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    let token = issue_token(&state.config, user.id)?;
    Ok(HttpResponse::Ok().json(json!({ "token": token, "user": user })))
}

#[get("/api/auth/me")]
async fn me(AuthUser(user): AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "user": user }))
}

#[put("/api/auth/profile")]
async fn update_profile(
    state: web::Data<AppState>,
    AuthUser(mut user): AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut form = UploadForm::read(payload, state.config.max_upload_bytes).await?;

    if let Some(name) = form.trimmed("name") {
        validate_name(name)?;
        user.name = name.to_string();
    }
    if let Some(bio) = form.text("bio") {
        let bio = bio.trim();
        if bio.chars().count() > BIO_MAX_CHARS {
            return Err(AppError::bad_request(format!(
                "Bio must be less than {} characters",
                BIO_MAX_CHARS
            )));
        }
        user.bio = bio.to_string();
    }
    if let Some(channel_name) = form.trimmed("channelName") {
        user.channel_name = channel_name.to_string();
    }

    let mut replaced = Vec::new();
    if let Some(file) = form.take_file("avatar") {
        let file = file.expect_kind("image", "avatar")?;
        let asset = state
            .media
            .put("avatars", &file.file_name, &file.content_type, file.data)
            .await?;
        replaced.push(std::mem::replace(&mut user.avatar, asset.url));
    }
    if let Some(file) = form.take_file("banner") {
        let file = file.expect_kind("image", "banner")?;
        let asset = state
            .media
            .put("banners", &file.file_name, &file.content_type, file.data)
            .await?;
        replaced.push(std::mem::replace(&mut user.banner, asset.url));
    }

    user.updated_at = Utc::now();
    if !state.store.update_user(&user).await? {
        return Err(AppError::not_found("User not found"));
    }

    let stale: Vec<&str> = replaced.iter().filter_map(|url| key_from_url(url)).collect();
    delete_quietly(state.media.as_ref(), &stale).await;
    info!("Updated profile of user {}", user.id);

    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}
