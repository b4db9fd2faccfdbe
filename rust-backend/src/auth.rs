use actix_web::dev::Payload;
use actix_web::{http::header, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures::future::LocalBoxFuture;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Claims, User};
use crate::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authorized, no token provided")]
    MissingToken,
    #[error("Not authorized, invalid token")]
    InvalidToken,
    #[error("Not authorized, token expired")]
    ExpiredToken,
    #[error("Not authorized, user not found")]
    UnknownUser,
    #[error("token could not be issued: {0}")]
    Issue(String),
}

pub fn issue_token(config: &Config, user_id: Uuid) -> Result<String, AuthError> {
    let exp = (Utc::now() + Duration::hours(config.jwt_expire_hours)).timestamp();
    let claims = Claims {
        user_id,
        exp: exp.max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AuthError::Issue(e.to_string()))
}

pub fn decode_token(config: &Config, token: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    web::block(move || bcrypt::hash(password, cost))
        .await?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    Ok(web::block(move || bcrypt::verify(password, &hash))
        .await?
        .unwrap_or(false))
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn app_state(req: &HttpRequest) -> Result<web::Data<AppState>, AppError> {
    req.app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("application state is not registered".into()))
}

async fn resolve_user(state: &AppState, token: &str) -> Result<User, AppError> {
    let claims = decode_token(&state.config, token)?;
    state
        .store
        .find_user(claims.user_id)
        .await?
        .ok_or_else(|| AuthError::UnknownUser.into())
}

/// The caller behind a valid bearer token. Rejects with 401 otherwise.
pub struct AuthUser(pub User);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = bearer_token(req);
        Box::pin(async move {
            let state = state?;
            let token = token.ok_or(AuthError::MissingToken)?;
            Ok(AuthUser(resolve_user(&state, &token).await?))
        })
    }
}

/// Like [`AuthUser`] but never rejects; a missing or bad token yields `None`.
pub struct OptionalUser(pub Option<User>);

impl FromRequest for OptionalUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = bearer_token(req);
        Box::pin(async move {
            let state = state?;
            let user = match token {
                Some(token) => match resolve_user(&state, &token).await {
                    Ok(user) => Some(user),
                    Err(AppError::Unauthorized(_)) => None,
                    Err(e) => return Err(e),
                },
                None => None,
            };
            Ok(OptionalUser(user))
        })
    }
}

/// An authenticated caller with the admin role. 401 without a valid token, 403 for other roles.
pub struct AdminUser(pub User);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = AuthUser::from_request(req, payload);
        Box::pin(async move {
            let AuthUser(user) = user.await?;
            if !user.is_admin() {
                return Err(AppError::forbidden("Access denied. Admin only."));
            }
            Ok(AdminUser(user))
        })
    }
}
