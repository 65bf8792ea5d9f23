//! SQL schema for the Linkage SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Rows are never deleted. Only link_precedence, linked_id and updated_at
-- are ever updated.
CREATE TABLE IF NOT EXISTS contacts (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    email           TEXT,
    phone_number    TEXT,
    linked_id       INTEGER REFERENCES contacts(id),
    link_precedence TEXT NOT NULL,   -- 'primary' | 'secondary'
    created_at      TEXT NOT NULL,   -- RFC 3339 UTC; server-assigned
    updated_at      TEXT NOT NULL,
    CHECK (
      (link_precedence = 'primary'   AND linked_id IS NULL) OR
      (link_precedence = 'secondary' AND linked_id IS NOT NULL)
    )
);

CREATE INDEX IF NOT EXISTS contacts_email_idx  ON contacts(email);
CREATE INDEX IF NOT EXISTS contacts_phone_idx  ON contacts(phone_number);
CREATE INDEX IF NOT EXISTS contacts_linked_idx ON contacts(linked_id);

PRAGMA user_version = 1;
";
