use face_detect_hub::config::{CONFIG, Config};
use face_detect_hub::db::Storage;
use face_detect_hub::service::seed::{SeedOutcome, seed_admin};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Create the admin account and demo cameras in the configured database.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg: &Config = &CONFIG;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone())))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let storage = Storage::connect(&cfg.database_url).await?;
    match seed_admin(&storage, &cfg.admin_username, &cfg.admin_password).await? {
        SeedOutcome::Skipped(admin) => {
            info!(username = %admin.username, "database already seeded");
        }
        SeedOutcome::Created { admin, cameras } => {
            info!(
                username = %admin.username,
                cameras = cameras.len(),
                "database seeded; log in with the configured admin password"
            );
        }
    }
    Ok(())
}
