//! Handlers for `/contacts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/contacts/{id}` | Cluster view, same envelope as `POST /identify` |
//! | `GET`  | `/contacts/{id}/record` | The stored contact row itself |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use linkage_core::{
  contact::{Contact, ContactId},
  identify::IdentifyResponse,
  store::IdentityStore,
};

use crate::error::ApiError;

/// `GET /contacts/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<IdentifyResponse>, ApiError>
where
  S: IdentityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let view = store
    .cluster_view(ContactId(id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("contact {id} not found")))?;
  Ok(Json(view.into()))
}

/// `GET /contacts/{id}/record`
pub async fn get_record<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Contact>, ApiError>
where
  S: IdentityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let contact = store
    .contact(ContactId(id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("contact {id} not found")))?;
  Ok(Json(contact))
}
