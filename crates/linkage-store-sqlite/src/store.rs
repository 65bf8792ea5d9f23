//! [`SqliteStore`]: the SQLite implementation of [`IdentityStore`].

use std::path::Path;

use chrono::Utc;
use linkage_core::{
  contact::{Contact, ContactId, ContactUpdate, NewContact},
  identify::{Identifiers, IdentityView},
  resolve,
  store::{ContactRepo, IdentityStore},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use crate::{
  Result,
  encode::{CONTACT_COLUMNS, RawContact, decode_dt, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Linkage identity store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted, and all clones
/// share its worker thread, so calls are serialised in submission order.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one transaction on the connection thread. The transaction
  /// commits only if `f` succeeds; otherwise it is dropped and rolled back.
  pub(crate) async fn transact<T, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut TxRepo<'_>) -> Result<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(behavior)?;
        let result = f(&mut TxRepo { conn: &tx });
        match &result {
          Ok(_) => tx.commit()?,
          Err(e) => tracing::warn!(error = %e, "rolling back transaction"),
        }
        Ok(result)
      })
      .await?;
    outcome
  }
}

// ─── Unit of work ────────────────────────────────────────────────────────────

/// [`ContactRepo`] over an open transaction.
pub(crate) struct TxRepo<'c> {
  conn: &'c rusqlite::Connection,
}

impl TxRepo<'_> {
  fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Contact>> {
    let mut stmt = self.conn.prepare_cached(sql)?;
    let raws = stmt
      .query_map(params, RawContact::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawContact::into_contact).collect()
  }
}

impl ContactRepo for TxRepo<'_> {
  type Error = crate::Error;

  fn find_by_identifier(&mut self, ids: &Identifiers) -> Result<Vec<Contact>> {
    // `col = NULL` is never true, so an absent identifier matches nothing.
    self.query(
      &format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts
         WHERE email = ?1 OR phone_number = ?2
         ORDER BY id"
      ),
      rusqlite::params![ids.email(), ids.phone_number()],
    )
  }

  fn find_by_cluster_root(&mut self, root: ContactId) -> Result<Vec<Contact>> {
    self.query(
      &format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts
         WHERE id = ?1 OR linked_id = ?1
         ORDER BY id"
      ),
      rusqlite::params![root.0],
    )
  }

  fn get(&mut self, id: ContactId) -> Result<Option<Contact>> {
    let raw = self
      .conn
      .query_row(
        &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
        rusqlite::params![id.0],
        RawContact::from_row,
      )
      .optional()?;
    raw.map(RawContact::into_contact).transpose()
  }

  fn create(&mut self, input: NewContact) -> Result<Contact> {
    let at_str = encode_dt(Utc::now());
    let at = decode_dt(&at_str)?;

    self.conn.execute(
      "INSERT INTO contacts (
         email, phone_number, linked_id, link_precedence, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
      rusqlite::params![
        input.email,
        input.phone_number,
        input.linked_id.map(|id| id.0),
        input.link_precedence.as_str(),
        at_str,
      ],
    )?;

    Ok(Contact {
      id:              ContactId(self.conn.last_insert_rowid()),
      email:           input.email,
      phone_number:    input.phone_number,
      linked_id:       input.linked_id,
      link_precedence: input.link_precedence,
      created_at:      at,
      updated_at:      at,
    })
  }

  fn update(&mut self, id: ContactId, update: ContactUpdate) -> Result<()> {
    let changed = self.conn.execute(
      "UPDATE contacts SET
         link_precedence = COALESCE(?2, link_precedence),
         linked_id       = COALESCE(?3, linked_id),
         updated_at      = ?4
       WHERE id = ?1",
      rusqlite::params![
        id.0,
        update.link_precedence.map(|p| p.as_str()),
        update.linked_id.map(|l| l.0),
        encode_dt(Utc::now()),
      ],
    )?;

    if changed == 0 {
      return Err(linkage_core::Error::ContactNotFound(id).into());
    }
    Ok(())
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = crate::Error;

  async fn identify(&self, ids: Identifiers) -> Result<IdentityView> {
    // IMMEDIATE takes the write lock up front, so no other writer can slip
    // between the match read and the demotions or inserts.
    self
      .transact(TransactionBehavior::Immediate, move |repo| {
        resolve::identify(repo, &ids)
      })
      .await
  }

  async fn cluster_view(&self, id: ContactId) -> Result<Option<IdentityView>> {
    self
      .transact(TransactionBehavior::Deferred, move |repo| resolve::view_for(repo, id))
      .await
  }

  async fn contact(&self, id: ContactId) -> Result<Option<Contact>> {
    self
      .transact(TransactionBehavior::Deferred, move |repo| repo.get(id))
      .await
  }
}
