//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision.

use chrono::{DateTime, SecondsFormat, Utc};
use linkage_core::contact::{Contact, ContactId, LinkPrecedence};

use crate::{Error, Result};

/// Column list matching [`RawContact::from_row`].
pub const CONTACT_COLUMNS: &str =
  "id, email, phone_number, linked_id, link_precedence, created_at, updated_at";

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── LinkPrecedence ──────────────────────────────────────────────────────────

pub fn decode_precedence(s: &str) -> Result<LinkPrecedence> {
  match s {
    "primary" => Ok(LinkPrecedence::Primary),
    "secondary" => Ok(LinkPrecedence::Secondary),
    other => Err(Error::UnknownPrecedence(other.to_owned())),
  }
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw values read directly from a `contacts` row.
pub struct RawContact {
  pub id:              i64,
  pub email:           Option<String>,
  pub phone_number:    Option<String>,
  pub linked_id:       Option<i64>,
  pub link_precedence: String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawContact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      email:           row.get(1)?,
      phone_number:    row.get(2)?,
      linked_id:       row.get(3)?,
      link_precedence: row.get(4)?,
      created_at:      row.get(5)?,
      updated_at:      row.get(6)?,
    })
  }

  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      id:              ContactId(self.id),
      email:           self.email,
      phone_number:    self.phone_number,
      linked_id:       self.linked_id.map(ContactId),
      link_precedence: decode_precedence(&self.link_precedence)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_roundtrip_at_micro_precision() {
    let dt = decode_dt("2023-04-01T12:30:45.123456Z").unwrap();
    assert_eq!(encode_dt(dt), "2023-04-01T12:30:45.123456Z");
  }

  #[test]
  fn unknown_precedence_is_rejected() {
    assert!(matches!(
      decode_precedence("tertiary"),
      Err(Error::UnknownPrecedence(s)) if s == "tertiary"
    ));
    assert_eq!(
      decode_precedence(LinkPrecedence::Secondary.as_str()).unwrap(),
      LinkPrecedence::Secondary
    );
  }
}
