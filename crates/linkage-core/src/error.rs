//! Error types for `linkage-core`.

use thiserror::Error;

use crate::contact::ContactId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Either email or phoneNumber must be provided")]
  MissingIdentifier,

  #[error("contact not found: {0}")]
  ContactNotFound(ContactId),

  #[error("link cycle detected at contact {0}")]
  LinkCycle(ContactId),

  #[error("matched contacts resolved to no primary")]
  NoPrimary,

  #[error("store lock poisoned")]
  Poisoned,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
