//! Startup wiring: builds the store and media backends named by [`Config`].

use std::sync::Arc;

use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use log::info;
use thiserror::Error;

use crate::auth::hash_password;
use crate::config::{Config, ConfigError, MediaBackend, StorageBackend};
use crate::error::AppError;
use crate::media::{MediaError, MediaStore, MemoryMediaStore, S3MediaStore};
use crate::models::{Role, User};
use crate::store::{MemoryStore, PgStore, Store, StoreError};
use crate::AppState;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("store initialisation failed: {0}")]
    Store(#[from] StoreError),

    #[error("media initialisation failed: {0}")]
    Media(#[from] MediaError),

    #[error("{0}")]
    App(#[from] AppError),
}

/// Outcome of [`seed_admin`].
#[derive(Debug)]
pub enum SeedOutcome {
    AlreadyPresent(User),
    Created(User),
}

pub async fn init_pg_store(config: &Config) -> Result<PgStore, StartupError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or(ConfigError::Missing("DATABASE_URL"))?;
    let store = PgStore::connect(url).await?;
    store.migrate().await?;
    info!("Connected to Postgres and applied migrations");
    Ok(store)
}

pub async fn init_s3_client(config: &Config) -> Client {
    let sdk_config = aws_config::from_env().load().await;
    let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

    if let Some(endpoint) = &config.minio_endpoint {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }

    let credentials = Credentials::new(
        config.minio_access_key.clone(),
        config.minio_secret_key.clone(),
        None,
        None,
        "env",
    );
    builder = builder.credentials_provider(credentials);

    builder = match sdk_config.region() {
        Some(region) => builder.region(region.clone()),
        None => builder.region(Region::new("us-east-1")),
    };

    Client::from_conf(builder.build())
}

pub async fn init_store(config: &Config) -> Result<Arc<dyn Store>, StartupError> {
    Ok(match config.storage_backend {
        StorageBackend::Postgres => Arc::new(init_pg_store(config).await?),
        StorageBackend::Memory => {
            info!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    })
}

pub async fn init_media(config: &Config) -> Result<Arc<dyn MediaStore>, StartupError> {
    Ok(match config.media_backend {
        MediaBackend::S3 => {
            let media = S3MediaStore::new(init_s3_client(config).await, config.media_bucket.clone());
            media.ensure_bucket().await?;
            Arc::new(media)
        }
        MediaBackend::Memory => Arc::new(MemoryMediaStore::new()),
    })
}

pub async fn build_state(config: Config) -> Result<AppState, StartupError> {
    let store = init_store(&config).await?;
    let media = init_media(&config).await?;
    Ok(AppState::new(store, media, config))
}

/// Creates the platform admin account unless an admin already exists.
pub async fn seed_admin(store: &dyn Store, config: &Config) -> Result<SeedOutcome, StartupError> {
    if let Some(existing) = store.find_admin().await? {
        return Ok(SeedOutcome::AlreadyPresent(existing));
    }
    let hash = hash_password(config.admin_password.clone(), config.bcrypt_cost).await?;
    let mut admin = User::new("Zentube Admin", &config.admin_email.trim().to_lowercase(), hash);
    admin.role = Role::Admin;
    admin.channel_name = "Zentube Official".to_string();
    admin.bio = "Official Zentube platform admin account.".to_string();
    store.insert_user(&admin).await?;
    Ok(SeedOutcome::Created(admin))
}
