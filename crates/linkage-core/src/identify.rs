//! Request and response types for identity resolution.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  contact::{Contact, ContactId},
};

// ─── Request ─────────────────────────────────────────────────────────────────

/// An identify request as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
  #[serde(default)]
  pub email:        Option<String>,
  #[serde(default)]
  pub phone_number: Option<String>,
}

impl IdentifyRequest {
  /// Validate the request, yielding the identifier pair the resolver accepts.
  pub fn identifiers(self) -> Result<Identifiers> {
    Identifiers::new(self.email, self.phone_number)
  }
}

/// A validated identifier pair: at least one side is present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifiers {
  email:        Option<String>,
  phone_number: Option<String>,
}

impl Identifiers {
  /// Empty strings count as absent. Values are otherwise kept verbatim.
  pub fn new(email: Option<String>, phone_number: Option<String>) -> Result<Self> {
    let email = normalise(email);
    let phone_number = normalise(phone_number);
    if email.is_none() && phone_number.is_none() {
      return Err(Error::MissingIdentifier);
    }
    Ok(Self { email, phone_number })
  }

  pub fn email(&self) -> Option<&str> { self.email.as_deref() }

  pub fn phone_number(&self) -> Option<&str> { self.phone_number.as_deref() }
}

fn normalise(value: Option<String>) -> Option<String> { value.filter(|v| !v.is_empty()) }

// ─── Response ────────────────────────────────────────────────────────────────

/// The consolidated view of one identity cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
  pub primary_contact_id:    ContactId,
  pub emails:                Vec<String>,
  pub phone_numbers:         Vec<String>,
  pub secondary_contact_ids: Vec<ContactId>,
}

impl IdentityView {
  /// Fold a cluster into its view. `members` must be in creation order; list
  /// order in the view is first occurrence in that order.
  pub fn from_cluster(primary_contact_id: ContactId, members: &[Contact]) -> Self {
    Self {
      primary_contact_id,
      emails: dedup(members.iter().filter_map(|c| c.email.as_deref())),
      phone_numbers: dedup(members.iter().filter_map(|c| c.phone_number.as_deref())),
      secondary_contact_ids: members
        .iter()
        .filter(|c| !c.is_primary())
        .map(|c| c.id)
        .collect(),
    }
  }
}

fn dedup<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
  let mut seen = HashSet::new();
  values
    .filter(|v| !v.is_empty() && seen.insert(*v))
    .map(str::to_owned)
    .collect()
}

/// Wire envelope: `{ "contact": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyResponse {
  pub contact: IdentityView,
}

impl From<IdentityView> for IdentifyResponse {
  fn from(contact: IdentityView) -> Self { Self { contact } }
}
