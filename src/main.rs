//! Business Annual Report service entry point
//!
//! `serve` (the default) runs the HTTP API; the other subcommands run one
//! batch job to completion and exit.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use business_ar_api::business::services::Services;
use business_ar_api::infrastructure::external::HttpClientFactory;
use business_ar_api::infrastructure::ServiceClients;
use business_ar_api::jobs::{ar_reminder, business_sync, LiveReminders, PaidFilingProcessor};
use business_ar_api::{create_routes, AppState, Config, Database};

#[derive(Parser, Debug)]
#[command(name = "business-ar-api", about = "Business Annual Report filing service", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API (default command)
    Serve,
    /// Email annual report reminders to businesses with an upcoming anniversary
    ArReminder,
    /// Copy upcoming-anniversary businesses from the registry warehouse
    BusinessSync,
    /// Push paid filings to the corporate registry
    ProcessPaidFilings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "business_ar_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::load()?);
    info!("✅ configuration loaded ({})", config.environment.deployment_environment);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::ArReminder => run_ar_reminder(config).await,
        Command::BusinessSync => run_business_sync(config).await,
        Command::ProcessPaidFilings => run_process_paid_filings(config).await,
    }
}

async fn connect(config: &Config) -> anyhow::Result<Database> {
    let database = Database::new(config).await.context("database connection failed")?;
    info!("✅ database connected");
    Ok(database)
}

async fn serve(config: Arc<Config>) -> anyhow::Result<()> {
    info!("🚀 starting business AR API");
    let database = connect(&config).await?;

    if config.database.run_migrations {
        database.migrate().await.context("migrations failed")?;
        info!("✅ migrations applied");
    } else if !database.check_migrations().await? {
        info!("⚠️ schema not found, run the migrations first");
    }

    let state = AppState::new(config.clone(), database.clone())?;
    let app = create_routes(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("🌐 listening on {}", address);

    axum::serve(listener, app)
        .tcp_nodelay(true)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("🛑 shutdown signal received, draining connections");
        })
        .await?;

    database.close().await;
    Ok(())
}

async fn run_ar_reminder(config: Arc<Config>) -> anyhow::Result<()> {
    let database = connect(&config).await?;
    let services = Services::new(config.clone(), database.clone())?;
    let notify_token = services
        .clients
        .tokens
        .service_token(&config.credentials.notify_api)
        .await
        .context("notify service token")?;

    let backend = LiveReminders::new(database.clone(), services.businesses, services.notifications, notify_token);
    ar_reminder::run(&backend, ar_reminder::today()).await?;
    database.close().await;
    Ok(())
}

async fn run_business_sync(config: Arc<Config>) -> anyhow::Result<()> {
    let database = connect(&config).await?;
    let warehouse = business_sync::connect_warehouse(&config).await?;

    let synced = business_sync::run(&warehouse, &database, &config).await?;
    info!("✅ {} businesses synced", synced);

    warehouse.close().await;
    database.close().await;
    Ok(())
}

async fn run_process_paid_filings(config: Arc<Config>) -> anyhow::Result<()> {
    let clients = ServiceClients::new(&config)?;
    let http = HttpClientFactory::create_client(config.services.timeout_seconds)?;

    let processor = PaidFilingProcessor::new(http, &config.services.business_ar_api_url, clients.colin);
    let summary = processor.run().await?;
    info!(
        "✅ paid filings: {} completed, {} failed, {} skipped",
        summary.completed.len(),
        summary.failed.len(),
        summary.skipped.len()
    );
    Ok(())
}
