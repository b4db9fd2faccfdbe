use dotenv::dotenv;
use log::{error, info, warn};

use zentube_backend::config::Config;
use zentube_backend::services::{init_store, seed_admin, SeedOutcome, StartupError};

async fn run() -> Result<SeedOutcome, StartupError> {
    let config = Config::from_env()?;
    let store = init_store(&config).await?;
    seed_admin(store.as_ref(), &config).await
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(SeedOutcome::AlreadyPresent(admin)) => warn!("Admin user already exists: {}", admin.email),
        Ok(SeedOutcome::Created(admin)) => {
            info!("Admin user created: {} (role {})", admin.email, admin.role.as_str())
        }
        Err(e) => {
            error!("Seed failed: {}", e);
            std::process::exit(1);
        }
    }
}
