use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cashier::config::Config;
use cashier::db;
use cashier::jobs::{self, JobDeps};
use cashier::services::bank::FioBank;
use cashier::services::notifier::TelegramNotifier;
use cashier::services::pairing::PairingService;
use cashier::services::telegram::TelegramPoller;
use cashier::services::xcontest::XContest;
use cashier::store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cashier=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting cashier...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool and apply the schema
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    // One store handle, one HTTP client, shared by every component.
    let store = Arc::new(PgStore::new(pool));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(&config.user_agent)
        .build()?;

    let bank = Arc::new(FioBank::new(
        client.clone(),
        config.fio_api_token.clone(),
        config.fio_api_url.clone(),
    ));
    let xcontest = Arc::new(XContest::new(
        client.clone(),
        config.xcontest_api_url.clone(),
    ));
    let notifier = Arc::new(TelegramNotifier::new(
        client.clone(),
        config.telegram_bot_token.clone(),
        config.telegram_chat_id,
        config.telegram_api_url.clone(),
    ));

    let deps = Arc::new(JobDeps {
        bank,
        activity: xcontest.clone(),
        transactions: store.clone(),
        memberships: store.clone(),
        flights: store.clone(),
        notifier,
        takeoff: config.takeoff.clone(),
        flight_watch_days_back: config.flight_watch_days_back,
    });
    let mut sched = jobs::start(
        deps,
        &config.transaction_watch_cron,
        &config.flight_watch_cron,
    )
    .await?;

    let pairing = Arc::new(PairingService::new(store.clone(), xcontest));
    let poller = TelegramPoller::new(
        client,
        config.telegram_bot_token.clone(),
        config.telegram_chat_id,
        config.telegram_api_url.clone(),
        pairing,
    );

    tokio::select! {
        _ = poller.run() => {}
        _ = shutdown_signal() => {}
    }

    sched.shutdown().await?;
    tracing::info!("Bye");

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, cleaning up...");
}
