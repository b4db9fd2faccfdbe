use std::env;
use std::fmt::Display;
use std::str::FromStr;

use log::{info, warn};
use thiserror::Error;

const DEFAULT_JWT_SECRET: &str = "secure_jwt_secret_key_12345";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaBackend {
    S3,
    Memory,
}

impl FromStr for MediaBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" | "minio" => Ok(MediaBackend::S3),
            "memory" => Ok(MediaBackend::Memory),
            other => Err(format!("unknown media backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub production: bool,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub media_backend: MediaBackend,
    pub minio_endpoint: Option<String>,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub media_bucket: String,
    pub jwt_secret: String,
    pub jwt_expire_hours: i64,
    pub bcrypt_cost: u32,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    /// Reads the process environment. Call `dotenv().ok()` first so a local `.env` is honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage_backend: StorageBackend = try_load("STORAGE_BACKEND", "postgres")?;
        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using the built-in development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        let app_env: String = try_load("APP_ENV", "development")?;

        Ok(Self {
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "5050")?,
            production: app_env.eq_ignore_ascii_case("production"),
            storage_backend,
            database_url,
            media_backend: try_load("MEDIA_BACKEND", "s3")?,
            minio_endpoint: env::var("MINIO_ENDPOINT").ok(),
            minio_access_key: try_load("MINIO_ACCESS_KEY", "minio")?,
            minio_secret_key: try_load("MINIO_SECRET_KEY", "minio123")?,
            media_bucket: try_load("MINIO_BUCKET", "videos")?,
            jwt_secret,
            jwt_expire_hours: try_load("JWT_EXPIRE_HOURS", "720")?,
            bcrypt_cost: try_load("BCRYPT_COST", "12")?,
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", "524288000")?,
            cors_allowed_origins: split_origins(&try_load::<String>(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000",
            )?),
            admin_email: try_load("ADMIN_EMAIL", "admin@zentro.com")?,
            admin_password: try_load("ADMIN_PASSWORD", "Admin@123456")?,
        })
    }

    /// In-memory configuration used by tests and throwaway local runs.
    pub fn in_memory() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5050,
            production: false,
            storage_backend: StorageBackend::Memory,
            database_url: None,
            media_backend: MediaBackend::Memory,
            minio_endpoint: None,
            minio_access_key: "minio".to_string(),
            minio_secret_key: "minio123".to_string(),
            media_bucket: "videos".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expire_hours: 720,
            bcrypt_cost: 4,
            max_upload_bytes: 500 * 1024 * 1024,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            admin_email: "admin@zentro.com".to_string(),
            admin_password: "Admin@123456".to_string(),
        }
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: e.to_string(),
    })
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
