//! Handler for `POST /identify`.
//!
//! Body: `{"email": "...", "phoneNumber": "..."}`; either field may be omitted
//! or `null`, but not both. `phoneNumber` may also be an integer JSON number.

use std::sync::Arc;

use axum::{Json, extract::State};
use linkage_core::{
  identify::{IdentifyRequest, IdentifyResponse},
  store::IdentityStore,
};
use serde::{Deserialize, Deserializer, de::Error as _};

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyBody {
  #[serde(default)]
  pub email:        Option<String>,
  #[serde(default, deserialize_with = "string_or_number")]
  pub phone_number: Option<String>,
}

impl From<IdentifyBody> for IdentifyRequest {
  fn from(b: IdentifyBody) -> Self {
    IdentifyRequest { email: b.email, phone_number: b.phone_number }
  }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Text(String),
    Number(serde_json::Number),
  }

  match Option::<Raw>::deserialize(deserializer)? {
    None => Ok(None),
    Some(Raw::Text(s)) => Ok(Some(s)),
    Some(Raw::Number(n)) if n.is_i64() || n.is_u64() => Ok(Some(n.to_string())),
    Some(Raw::Number(n)) => Err(D::Error::custom(format!(
      "phoneNumber must be a string or an integer, got {n}"
    ))),
  }
}

/// `POST /identify`
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<IdentifyBody>,
) -> Result<Json<IdentifyResponse>, ApiError>
where
  S: IdentityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let ids = IdentifyRequest::from(body).identifiers()?;
  let view = store.identify(ids).await.map_err(ApiError::store)?;
  tracing::debug!(
    primary = %view.primary_contact_id,
    secondaries = view.secondary_contact_ids.len(),
    "identified contact"
  );
  Ok(Json(view.into()))
}
