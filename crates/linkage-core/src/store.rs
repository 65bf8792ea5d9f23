//! Persistence traits consumed by the resolver and the HTTP layer.
//!
//! [`ContactRepo`] is the synchronous unit of work the resolution algorithm
//! runs against: every call made during one identify happens inside a single
//! atomic transaction opened by the backend. [`IdentityStore`] is the async
//! facade the transport layer depends on; backends implement it by opening
//! that transaction and driving [`crate::resolve`] inside it.

use std::future::Future;

use crate::{
  contact::{Contact, ContactId, ContactUpdate, NewContact},
  identify::{Identifiers, IdentityView},
};

// ─── Unit of work ────────────────────────────────────────────────────────────

/// Operations the resolver needs from storage. All list results are in
/// creation order (ascending [`ContactId`]).
pub trait ContactRepo {
  type Error: From<crate::Error>;

  /// Every contact whose email equals `ids.email()` or whose phone number
  /// equals `ids.phone_number()`. An absent identifier does not constrain.
  fn find_by_identifier(&mut self, ids: &Identifiers) -> Result<Vec<Contact>, Self::Error>;

  /// `root` itself plus every contact whose `linked_id` is `root`.
  fn find_by_cluster_root(&mut self, root: ContactId) -> Result<Vec<Contact>, Self::Error>;

  fn get(&mut self, id: ContactId) -> Result<Option<Contact>, Self::Error>;

  /// Persist a new contact; the store assigns the id and timestamps.
  fn create(&mut self, input: NewContact) -> Result<Contact, Self::Error>;

  /// Apply a partial update and bump `updated_at`. Updating a missing id is
  /// [`crate::Error::ContactNotFound`].
  fn update(&mut self, id: ContactId, update: ContactUpdate) -> Result<(), Self::Error>;
}

// ─── Async facade ────────────────────────────────────────────────────────────

/// Abstraction over a Linkage storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait IdentityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Resolve `ids` against the stored clusters, merging and recording as
  /// needed, and return the resulting view. Either every write commits or
  /// none does.
  fn identify(
    &self,
    ids: Identifiers,
  ) -> impl Future<Output = Result<IdentityView, Self::Error>> + Send + '_;

  /// Read-only view of the cluster containing `id`. Returns `None` if no such
  /// contact exists.
  fn cluster_view(
    &self,
    id: ContactId,
  ) -> impl Future<Output = Result<Option<IdentityView>, Self::Error>> + Send + '_;

  /// Retrieve a single contact record.
  fn contact(
    &self,
    id: ContactId,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;
}
