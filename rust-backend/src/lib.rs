use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod media;
pub mod models;
pub mod recommend;
pub mod search;
pub mod services;
pub mod store;
pub mod upload;

use crate::config::Config;
use crate::media::MediaStore;
use crate::store::Store;

/// Shared per-worker state, registered as `web::Data<AppState>`.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: Arc<dyn MediaStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, media: Arc<dyn MediaStore>, config: Config) -> Self {
        Self { store, media, config }
    }
}
