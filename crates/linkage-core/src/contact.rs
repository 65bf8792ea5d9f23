//! Contact: the single persisted entity.
//!
//! A contact carries at most one email and one phone number. Contacts that
//! share either identifier belong to the same identity cluster, represented by
//! one primary contact and the secondaries linked to it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identify::Identifiers;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Store-assigned contact id.
///
/// Ids come from a strictly increasing sequence, so ascending id order is
/// creation order. All ordering decisions use this, never `created_at`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContactId(pub i64);

impl fmt::Display for ContactId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Whether a contact represents its cluster or is merged into another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
  Primary,
  Secondary,
}

impl LinkPrecedence {
  pub fn as_str(self) -> &'static str {
    match self {
      LinkPrecedence::Primary => "primary",
      LinkPrecedence::Secondary => "secondary",
    }
  }
}

// ─── Contact ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
  pub id:              ContactId,
  pub email:           Option<String>,
  pub phone_number:    Option<String>,
  /// Set only on secondaries; points at the cluster's primary.
  pub linked_id:       Option<ContactId>,
  pub link_precedence: LinkPrecedence,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Contact {
  pub fn is_primary(&self) -> bool { self.link_precedence == LinkPrecedence::Primary }
}

// ─── Write inputs ────────────────────────────────────────────────────────────

/// Input to [`ContactRepo::create`](crate::store::ContactRepo::create). The
/// store assigns the id and both timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
  pub email:           Option<String>,
  pub phone_number:    Option<String>,
  pub linked_id:       Option<ContactId>,
  pub link_precedence: LinkPrecedence,
}

impl NewContact {
  /// A fresh cluster root carrying the submitted identifiers.
  pub fn primary(ids: &Identifiers) -> Self {
    Self {
      email:           ids.email().map(str::to_owned),
      phone_number:    ids.phone_number().map(str::to_owned),
      linked_id:       None,
      link_precedence: LinkPrecedence::Primary,
    }
  }

  /// A secondary attached to the primary `linked_id`.
  pub fn secondary(ids: &Identifiers, linked_id: ContactId) -> Self {
    Self {
      email:           ids.email().map(str::to_owned),
      phone_number:    ids.phone_number().map(str::to_owned),
      linked_id:       Some(linked_id),
      link_precedence: LinkPrecedence::Secondary,
    }
  }
}

/// Partial update applied by
/// [`ContactRepo::update`](crate::store::ContactRepo::update). `None` leaves a
/// field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactUpdate {
  pub link_precedence: Option<LinkPrecedence>,
  pub linked_id:       Option<ContactId>,
}

impl ContactUpdate {
  /// Turn a primary into a secondary of `primary`.
  pub fn demote_to(primary: ContactId) -> Self {
    Self {
      link_precedence: Some(LinkPrecedence::Secondary),
      linked_id:       Some(primary),
    }
  }

  /// Point an existing secondary at a different primary.
  pub fn relink_to(primary: ContactId) -> Self {
    Self { link_precedence: None, linked_id: Some(primary) }
  }
}
