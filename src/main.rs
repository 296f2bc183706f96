//! instant-preview server binary.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │                PREVIEW SERVER                 │
//!                 │                                               │
//!   Upload ───────┼─▶ http ──▶ ingest ──▶ unpack ──┐              │
//!                 │                                ▼              │
//!                 │                           site store          │
//!                 │                                ▲              │
//!   Preview ──────┼─▶ http ──▶ resolve ────────────┘              │
//!                 │                                               │
//!                 │   sweep (background): evict expired sites     │
//!                 └──────────────────────────────────────────────┘
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use instant_preview::config::{self, ServerConfig};
use instant_preview::http::HttpServer;
use instant_preview::site::model::Site;
use instant_preview::site::store::SiteStore;
use instant_preview::sweep::ExpirySweeper;

#[derive(Parser)]
#[command(name = "instant-preview", about = "Ephemeral static-site hosting")]
struct Cli {
    /// Run the server
    #[arg(long)]
    run: bool,

    /// Path to a TOML config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if !cli.run {
        Cli::command().print_help()?;
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "instant_preview=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("instant-preview v0.1.0 starting");

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };
    tracing::info!(
        bind_address = %config.listener.bind_address,
        data_dir = %config.storage.data_dir.display(),
        ttl_secs = config.expiry.ttl_secs,
        "Configuration loaded"
    );

    // temporary sites never survive a restart
    if config.storage.data_dir.exists() {
        fs::remove_dir_all(&config.storage.data_dir)?;
    }
    fs::create_dir_all(&config.storage.data_dir)?;
    fs::create_dir_all(&config.storage.premium_data_dir)?;

    let store = Arc::new(SiteStore::new());
    load_premium_sites(&config, &store);

    let sweeper = ExpirySweeper::new(
        store.clone(),
        Duration::from_secs(config.expiry.ttl_secs),
        Duration::from_secs(config.expiry.sweep_interval_secs),
    );
    tokio::spawn(async move {
        sweeper.run().await;
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(Arc::new(config), store);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Register every configured premium site, rebuilding its file set from
/// its persistent directory. A failing site is logged and skipped.
fn load_premium_sites(config: &ServerConfig, store: &SiteStore) {
    for cred in config::load_premium_credentials(&config.premium) {
        let dir = config.storage.premium_data_dir.join(&cred.name);
        if let Err(err) = fs::create_dir_all(&dir) {
            tracing::warn!(site = %cred.name, error = %err, "Premium site directory not created");
            continue;
        }
        match Site::new_premium(cred.name.clone(), dir, cred.password) {
            Ok(site) => {
                tracing::info!(
                    site = %site.name,
                    files = site.files.len(),
                    "Premium site loaded"
                );
                if let Err(err) = store.register(site) {
                    tracing::warn!(site = %cred.name, error = %err, "Premium site not registered");
                }
            }
            Err(err) => {
                tracing::warn!(site = %cred.name, error = %err, "Premium site scan failed");
            }
        }
    }
}
