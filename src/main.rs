use backon::{ExponentialBuilder, Retryable};
use face_detect_hub::config::{CONFIG, Config, DEFAULT_JWT_SECRET};
use face_detect_hub::db::Storage;
use face_detect_hub::error::HubError;
use face_detect_hub::router::{HubState, hub_router};
use face_detect_hub::service::{broadcaster, login_limiter, stats};
use mimalloc::MiMalloc;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg: &Config = &CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        listen = %cfg.listen_addr(),
        loglevel = %cfg.loglevel,
        worker_ingest = cfg.worker_key.is_some(),
    );
    if cfg.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("JWT_SECRET is the built-in default; set it before exposing this service");
    }

    let storage = match (|| Storage::connect(&cfg.database_url))
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_max_delay(Duration::from_secs(5))
                .with_max_times(5),
        )
        .notify(|err: &HubError, dur: Duration| {
            warn!("database connect failed: {}, retrying in {:?}", err, dur);
        })
        .await
    {
        Ok(storage) => storage,
        Err(e) => {
            error!(error = %e, "database unavailable; giving up");
            std::process::exit(1);
        }
    };
    info!("Database connected");

    let handle = broadcaster::spawn().await?;
    let ticker = cfg
        .stats_interval()
        .map(|period| stats::spawn_ticker(storage.clone(), handle.clone(), period));

    let state = HubState::new(Arc::new(cfg.clone()), storage, handle);
    let limiter_cleanup =
        login_limiter::spawn_cleanup(state.login_limiter.clone(), login_limiter::CLEANUP_INTERVAL);
    let app = hub_router(state);

    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    limiter_cleanup.abort();
    info!("Server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
