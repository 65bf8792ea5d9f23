//! Process wiring for the Linkage identity server: configuration loading and
//! the top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use linkage_core::store::IdentityStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// under `LINKAGE_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:  String,
  #[serde(default = "default_port")]
  pub port:  u16,
  #[serde(default)]
  pub store: StoreConfig,
}

/// Which backend holds the contacts.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
  Sqlite { path: PathBuf },
  /// Process-local; everything is lost on exit.
  Memory,
}

impl Default for StoreConfig {
  fn default() -> Self { StoreConfig::Sqlite { path: PathBuf::from("linkage.db") } }
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 3000 }

impl ServerConfig {
  /// Read `path` (optional) and `LINKAGE_*` variables, e.g.
  /// `LINKAGE_PORT=8080` or `LINKAGE_STORE__PATH=/var/lib/linkage.db`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("LINKAGE").separator("__"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the JSON API with request tracing.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: IdentityStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  linkage_api::api_router(store).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{body::Body, http::Request};
  use config::{Config, File, FileFormat};
  use linkage_core::memory::MemoryStore;
  use tower::ServiceExt as _;

  fn parse(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.address(), "127.0.0.1:3000");
    assert_eq!(cfg.store, StoreConfig::default());
  }

  #[test]
  fn sqlite_and_memory_stores_parse() {
    let cfg = parse(
      r#"
      host = "0.0.0.0"
      port = 8080

      [store]
      kind = "sqlite"
      path = "~/linkage/contacts.db"
      "#,
    );
    assert_eq!(cfg.address(), "0.0.0.0:8080");
    assert_eq!(
      cfg.store,
      StoreConfig::Sqlite { path: PathBuf::from("~/linkage/contacts.db") }
    );

    let cfg = parse("[store]\nkind = \"memory\"\n");
    assert_eq!(cfg.store, StoreConfig::Memory);
  }

  #[test]
  fn missing_config_file_is_not_an_error() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/linkage.toml"));
    assert!(cfg.is_ok());
  }

  #[test]
  fn tilde_expands_only_at_start() {
    let plain = Path::new("/data/linkage.db");
    assert_eq!(expand_tilde(plain), plain);
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(
        expand_tilde(Path::new("~/linkage.db")),
        PathBuf::from(home).join("linkage.db")
      );
    }
  }

  #[tokio::test]
  async fn app_serves_identify() {
    let app = app(Arc::new(MemoryStore::new()));
    let req = Request::builder()
      .method("POST")
      .uri("/identify")
      .header("content-type", "application/json")
      .body(Body::from(r#"{"phoneNumber":"123"}"#))
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), 200);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["contact"]["phoneNumbers"][0], "123");
  }
}
