//! [`MemoryStore`]: an in-process [`IdentityStore`] backed by a `Vec`.
//!
//! Each identify runs directly against the shared state while recording an
//! undo journal: the prior version of every updated contact plus the length
//! and id counter at the start. A failure replays the journal, so it leaves
//! no partial writes. The mutex serialises requests, which covers every
//! cluster at once.

use std::sync::Mutex;

use chrono::Utc;

use crate::{
  Error, Result,
  contact::{Contact, ContactId, ContactUpdate, NewContact},
  identify::{Identifiers, IdentityView},
  resolve,
  store::{ContactRepo, IdentityStore},
};

#[derive(Debug, Default)]
pub struct MemoryStore {
  state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryState {
  /// Kept in id order.
  contacts: Vec<Contact>,
  next_id:  i64,
  /// Index and prior value of each contact updated in the open transaction.
  undo:     Vec<(usize, Contact)>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Start from existing records, e.g. data migrated from another store.
  pub fn with_contacts(mut contacts: Vec<Contact>) -> Self {
    contacts.sort_by_key(|c| c.id);
    let next_id = contacts.last().map_or(0, |c| c.id.0);
    Self {
      state: Mutex::new(MemoryState { contacts, next_id, undo: Vec::new() }),
    }
  }

  /// Snapshot of every stored contact, in creation order.
  pub fn contacts(&self) -> Result<Vec<Contact>> {
    Ok(self.state.lock().map_err(|_| Error::Poisoned)?.contacts.clone())
  }

  /// Run `f` as one transaction, rolling every write back if it fails.
  pub(crate) fn transact<T>(
    &self,
    f: impl FnOnce(&mut MemoryState) -> Result<T>,
  ) -> Result<T> {
    let mut guard = self.state.lock().map_err(|_| Error::Poisoned)?;
    let state = &mut *guard;
    let len = state.contacts.len();
    let next_id = state.next_id;
    state.undo.clear();

    let result = f(state);
    if result.is_err() {
      while let Some((index, prior)) = state.undo.pop() {
        state.contacts[index] = prior;
      }
      state.contacts.truncate(len);
      state.next_id = next_id;
    }
    state.undo.clear();
    result
  }
}

// ─── Unit of work ────────────────────────────────────────────────────────────

impl ContactRepo for MemoryState {
  type Error = Error;

  fn find_by_identifier(&mut self, ids: &Identifiers) -> Result<Vec<Contact>> {
    Ok(
      self
        .contacts
        .iter()
        .filter(|c| {
          ids.email().is_some_and(|e| c.email.as_deref() == Some(e))
            || ids
              .phone_number()
              .is_some_and(|p| c.phone_number.as_deref() == Some(p))
        })
        .cloned()
        .collect(),
    )
  }

  fn find_by_cluster_root(&mut self, root: ContactId) -> Result<Vec<Contact>> {
    Ok(
      self
        .contacts
        .iter()
        .filter(|c| c.id == root || c.linked_id == Some(root))
        .cloned()
        .collect(),
    )
  }

  fn get(&mut self, id: ContactId) -> Result<Option<Contact>> {
    Ok(self.contacts.iter().find(|c| c.id == id).cloned())
  }

  fn create(&mut self, input: NewContact) -> Result<Contact> {
    self.next_id += 1;
    let now = Utc::now();
    let contact = Contact {
      id:              ContactId(self.next_id),
      email:           input.email,
      phone_number:    input.phone_number,
      linked_id:       input.linked_id,
      link_precedence: input.link_precedence,
      created_at:      now,
      updated_at:      now,
    };
    self.contacts.push(contact.clone());
    Ok(contact)
  }

  fn update(&mut self, id: ContactId, update: ContactUpdate) -> Result<()> {
    let index = self
      .contacts
      .iter()
      .position(|c| c.id == id)
      .ok_or(Error::ContactNotFound(id))?;
    self.undo.push((index, self.contacts[index].clone()));

    let contact = &mut self.contacts[index];
    if let Some(precedence) = update.link_precedence {
      contact.link_precedence = precedence;
    }
    if let Some(linked_id) = update.linked_id {
      contact.linked_id = Some(linked_id);
    }
    contact.updated_at = Utc::now();
    Ok(())
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for MemoryStore {
  type Error = Error;

  async fn identify(&self, ids: Identifiers) -> Result<IdentityView> {
    self.transact(|state| resolve::identify(state, &ids))
  }

  async fn cluster_view(&self, id: ContactId) -> Result<Option<IdentityView>> {
    self.transact(|state| resolve::view_for(state, id))
  }

  async fn contact(&self, id: ContactId) -> Result<Option<Contact>> {
    self.state.lock().map_err(|_| Error::Poisoned)?.get(id)
  }
}
