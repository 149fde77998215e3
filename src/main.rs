use anyhow::Context;
use pharmacy_ledger::ledger::{AccountStore, SettingsStore};
use pharmacy_ledger::{api, config::Config, db::init_db, Ledger, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("Failed to initialize database at {}", config.database_path))?;

    let repo = Repository::with_defaults(pool, config.platform_defaults())
        .await
        .context("Failed to seed platform settings")?;
    let repo = Arc::new(repo);
    let accounts: Arc<dyn AccountStore> = repo.clone();
    let settings: Arc<dyn SettingsStore> = repo;
    let ledger = Ledger::new(accounts, settings, config.paging());

    let app = api::create_router(api::AppState::new(ledger));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
