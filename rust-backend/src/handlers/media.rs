use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{get, web, HttpResponse};

use crate::error::AppError;
use crate::AppState;

/// Streams a stored object back with the content type it was uploaded with.
#[get("/api/media/{key:.*}")]
async fn get_media(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let key = path.into_inner();
    if key.is_empty() || key.split('/').any(|segment| segment == "..") {
        return Err(AppError::not_found("Media not found"));
    }
    let object = state
        .media
        .get(&key)
        .await?
        .ok_or_else(|| AppError::not_found("Media not found"))?;

    Ok(HttpResponse::Ok()
        .content_type(object.content_type)
        .insert_header(CacheControl(vec![CacheDirective::Public, CacheDirective::MaxAge(86400)]))
        .body(object.data))
}
