//! Linkage server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the
//! configured store, and serves the identity API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use linkage_core::{memory::MemoryStore, store::IdentityStore};
use linkage_server::{ServerConfig, StoreConfig, app, expand_tilde};
use linkage_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Linkage identity resolution server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  match &server_cfg.store {
    StoreConfig::Sqlite { path } => {
      let store_path = expand_tilde(path);
      let store = SqliteStore::open(&store_path)
        .await
        .with_context(|| format!("failed to open store at {store_path:?}"))?;
      tracing::info!(path = ?store_path, "opened sqlite store");
      serve(&server_cfg, store).await
    }
    StoreConfig::Memory => {
      tracing::warn!("using in-memory store; contacts will not persist");
      serve(&server_cfg, MemoryStore::new()).await
    }
  }
}

async fn serve<S>(server_cfg: &ServerConfig, store: S) -> anyhow::Result<()>
where
  S: IdentityStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let app = app(Arc::new(store));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
