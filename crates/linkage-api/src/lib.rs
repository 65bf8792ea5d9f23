//! JSON HTTP API for Linkage.
//!
//! Exposes an axum [`Router`] backed by any
//! [`linkage_core::store::IdentityStore`]. TLS, auth and request tracing are
//! the caller's responsibility.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/identify` | Body: [`identify::IdentifyBody`]; 400 if neither identifier is set |
//! | `GET`  | `/contacts/{id}` | Cluster view for any member id; 404 if unknown |
//! | `GET`  | `/contacts/{id}/record` | Raw contact record; 404 if unknown |
//! | `GET`  | `/health` | Liveness probe |

pub mod contacts;
pub mod error;
pub mod identify;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, post},
};
use linkage_core::store::IdentityStore;
use serde_json::{Value, json};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: IdentityStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/identify", post(identify::handler::<S>))
    .route("/contacts/{id}", get(contacts::get_one::<S>))
    .route("/contacts/{id}/record", get(contacts::get_record::<S>))
    .route("/health", get(health))
    .with_state(store)
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

// ─── Integration tests ────────────────────────────────────────────────────────
