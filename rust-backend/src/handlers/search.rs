use actix_web::{get, web, HttpResponse};

use crate::error::AppError;
use crate::search::{search, SearchParams};
use crate::AppState;

#[get("/api/search")]
async fn search_all(state: web::Data<AppState>, params: web::Query<SearchParams>) -> Result<HttpResponse, AppError> {
    let results = search(state.store.as_ref(), &params).await?;
    Ok(HttpResponse::Ok().json(results))
}
