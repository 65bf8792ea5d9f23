//! Integration tests for `SqliteStore` against an in-memory database.

use linkage_core::{
  contact::{ContactId, ContactUpdate, LinkPrecedence, NewContact},
  identify::Identifiers,
  store::{ContactRepo, IdentityStore},
};
use rusqlite::TransactionBehavior;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn ids(email: Option<&str>, phone: Option<&str>) -> Identifiers {
  Identifiers::new(email.map(str::to_owned), phone.map(str::to_owned)).unwrap()
}

async fn all_contacts(s: &SqliteStore) -> Vec<linkage_core::contact::Contact> {
  let mut out = Vec::new();
  let mut id = 1;
  while let Some(c) = s.contact(ContactId(id)).await.unwrap() {
    out.push(c);
    id += 1;
  }
  out
}

// ─── Repo operations ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_roundtrip() {
  let s = store().await;

  let created = s
    .transact(TransactionBehavior::Immediate, |repo| {
      repo.create(NewContact::primary(&ids(Some("a@x.com"), Some("111"))))
    })
    .await
    .unwrap();
  assert_eq!(created.id, ContactId(1));

  let fetched = s.contact(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
  assert!(fetched.is_primary());
  assert_eq!(fetched.linked_id, None);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.contact(ContactId(42)).await.unwrap().is_none());
}

#[tokio::test]
async fn find_by_identifier_ignores_absent_side() {
  let s = store().await;

  let found = s
    .transact(TransactionBehavior::Immediate, |repo| {
      repo.create(NewContact::primary(&ids(Some("a@x.com"), None)))?;
      repo.create(NewContact::primary(&ids(None, Some("111"))))?;
      repo.create(NewContact::primary(&ids(Some("b@x.com"), Some("222"))))?;
      repo.find_by_identifier(&ids(Some("a@x.com"), None))
    })
    .await
    .unwrap();

  // The phone-only contact has a NULL email and must not match.
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].email.as_deref(), Some("a@x.com"));
}

#[tokio::test]
async fn find_by_cluster_root_returns_root_and_children() {
  let s = store().await;

  let cluster = s
    .transact(TransactionBehavior::Immediate, |repo| {
      let root = repo.create(NewContact::primary(&ids(Some("a@x.com"), None)))?;
      repo.create(NewContact::primary(&ids(Some("z@x.com"), None)))?;
      repo.create(NewContact::secondary(&ids(Some("a@x.com"), Some("1")), root.id))?;
      repo.find_by_cluster_root(root.id)
    })
    .await
    .unwrap();

  let ids: Vec<_> = cluster.iter().map(|c| c.id).collect();
  assert_eq!(ids, [ContactId(1), ContactId(3)]);
}

#[tokio::test]
async fn update_missing_contact_errors() {
  let s = store().await;
  let err = s
    .transact(TransactionBehavior::Immediate, |repo| {
      repo.update(ContactId(9), ContactUpdate::relink_to(ContactId(1)))
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(linkage_core::Error::ContactNotFound(ContactId(9)))
  ));
}

#[tokio::test]
async fn schema_rejects_primary_with_link() {
  let s = store().await;
  let err = s
    .transact(TransactionBehavior::Immediate, |repo| {
      let a = repo.create(NewContact::primary(&ids(Some("a@x.com"), None)))?;
      let b = repo.create(NewContact::primary(&ids(Some("b@x.com"), None)))?;
      repo.update(b.id, ContactUpdate::relink_to(a.id))
    })
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Sqlite(_)));
}

#[tokio::test]
async fn failed_transaction_rolls_back_everything() {
  let s = store().await;
  s.identify(ids(Some("a@x.com"), None)).await.unwrap();

  let err = s
    .transact(TransactionBehavior::Immediate, |repo| {
      let b = repo.create(NewContact::primary(&ids(Some("b@x.com"), None)))?;
      repo.update(ContactId(1), ContactUpdate::demote_to(b.id))?;
      repo.update(ContactId(77), ContactUpdate::relink_to(b.id))
    })
    .await;
  assert!(err.is_err());

  let contacts = all_contacts(&s).await;
  assert_eq!(contacts.len(), 1);
  assert_eq!(contacts[0].link_precedence, LinkPrecedence::Primary);
}

// ─── Identify ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn identify_new_then_partial_match() {
  let s = store().await;

  let first = s.identify(ids(Some("lorraine@hillvalley.edu"), Some("123456"))).await.unwrap();
  assert_eq!(first.primary_contact_id, ContactId(1));
  assert!(first.secondary_contact_ids.is_empty());

  let second = s
    .identify(ids(Some("mcfly@hillvalley.edu"), Some("123456")))
    .await
    .unwrap();
  assert_eq!(second.primary_contact_id, ContactId(1));
  assert_eq!(second.emails, ["lorraine@hillvalley.edu", "mcfly@hillvalley.edu"]);
  assert_eq!(second.phone_numbers, ["123456"]);
  assert_eq!(second.secondary_contact_ids, [ContactId(2)]);

  let again = s
    .identify(ids(Some("mcfly@hillvalley.edu"), Some("123456")))
    .await
    .unwrap();
  assert_eq!(again, second);
  assert_eq!(all_contacts(&s).await.len(), 2);
}

#[tokio::test]
async fn identify_merges_two_primaries() {
  let s = store().await;
  s.identify(ids(Some("george@hillvalley.edu"), Some("919191"))).await.unwrap();
  s.identify(ids(Some("biffsucks@hillvalley.edu"), Some("717171"))).await.unwrap();

  let view = s
    .identify(ids(Some("george@hillvalley.edu"), Some("717171")))
    .await
    .unwrap();

  assert_eq!(view.primary_contact_id, ContactId(1));
  assert_eq!(view.emails, ["george@hillvalley.edu", "biffsucks@hillvalley.edu"]);
  assert_eq!(view.phone_numbers, ["919191", "717171"]);
  assert_eq!(view.secondary_contact_ids, [ContactId(2)]);

  let demoted = s.contact(ContactId(2)).await.unwrap().unwrap();
  assert_eq!(demoted.link_precedence, LinkPrecedence::Secondary);
  assert_eq!(demoted.linked_id, Some(ContactId(1)));
  assert!(demoted.updated_at >= demoted.created_at);
}

#[tokio::test]
async fn merge_reparents_existing_secondaries() {
  let s = store().await;
  s.identify(ids(Some("a@x.com"), Some("1"))).await.unwrap();
  s.identify(ids(Some("b@x.com"), Some("2"))).await.unwrap();
  s.identify(ids(Some("b@x.com"), Some("3"))).await.unwrap();

  let view = s.identify(ids(Some("a@x.com"), Some("3"))).await.unwrap();
  assert_eq!(view.primary_contact_id, ContactId(1));
  assert_eq!(view.secondary_contact_ids, [ContactId(2), ContactId(3)]);

  let third = s.contact(ContactId(3)).await.unwrap().unwrap();
  assert_eq!(third.linked_id, Some(ContactId(1)));
}

#[tokio::test]
async fn cluster_view_from_any_member() {
  let s = store().await;
  s.identify(ids(Some("a@x.com"), Some("1"))).await.unwrap();
  s.identify(ids(Some("a@x.com"), Some("2"))).await.unwrap();

  let from_secondary = s.cluster_view(ContactId(2)).await.unwrap().unwrap();
  let from_primary = s.cluster_view(ContactId(1)).await.unwrap().unwrap();
  assert_eq!(from_secondary, from_primary);
  assert!(s.cluster_view(ContactId(3)).await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_identical_requests_create_one_primary() {
  let s = store().await;

  let handles: Vec<_> = (0..16)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move {
        s.identify(ids(Some("race@x.com"), Some("000"))).await.unwrap()
      })
    })
    .collect();

  let mut views = Vec::new();
  for h in handles {
    views.push(h.await.unwrap());
  }

  assert!(views.iter().all(|v| v == &views[0]));
  assert_eq!(all_contacts(&s).await.len(), 1);
}

#[tokio::test]
async fn file_store_persists_across_reopen() {
  let path = std::env::temp_dir().join(format!(
    "linkage-store-test-{}-{}.db",
    std::process::id(),
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
  ));

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.identify(ids(Some("a@x.com"), Some("1"))).await.unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  let view = s.identify(ids(Some("a@x.com"), None)).await.unwrap();
  assert_eq!(view.primary_contact_id, ContactId(1));
  assert_eq!(view.phone_numbers, ["1"]);

  drop(s);
  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
  }
}
