//! Identity resolution: matching, cluster merging and view building.
//!
//! Every function here runs against a [`ContactRepo`] unit of work and leaves
//! transaction boundaries to the caller. The flow for one request is
//!
//! 1. [`find_matches`]: contacts sharing the submitted email or phone.
//! 2. No match: create a new primary.
//! 3. Otherwise [`resolve_clusters`]: elect the oldest primary among the
//!    touched clusters, demote the rest, record a secondary for unseen
//!    identifiers.
//! 4. [`build_view`] of the surviving cluster.
//!
//! Ordering always uses [`ContactId`] (creation sequence). When a primary is
//! demoted its whole cluster is re-parented onto the survivor, so after a
//! merge every secondary links directly to its primary. Reads still follow
//! `linked_id` transitively, so clusters written before re-parenting existed
//! resolve the same way.

use std::collections::HashSet;

use crate::{
  Error,
  contact::{Contact, ContactId, ContactUpdate, NewContact},
  identify::{Identifiers, IdentityView},
  store::ContactRepo,
};

/// Outcome of [`resolve_clusters`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  /// The surviving primary of the (possibly merged) cluster.
  pub primary_id: ContactId,
  /// Former primaries demoted into `primary_id`, in creation order.
  pub demoted:    Vec<ContactId>,
  /// Secondary recorded for previously unseen identifiers, if any.
  pub created:    Option<Contact>,
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Resolve `ids` and return the consolidated view of the resulting cluster.
pub fn identify<R: ContactRepo>(
  repo: &mut R,
  ids: &Identifiers,
) -> Result<IdentityView, R::Error> {
  let matches = find_matches(repo, ids)?;

  if matches.is_empty() {
    let contact = repo.create(NewContact::primary(ids))?;
    tracing::info!(contact_id = %contact.id, "created primary contact");
    return build_view(repo, contact.id);
  }

  let resolution = resolve_clusters(repo, &matches, ids)?;
  tracing::debug!(
    primary = %resolution.primary_id,
    demoted = resolution.demoted.len(),
    created = ?resolution.created.as_ref().map(|c| c.id),
    "resolved existing identity"
  );
  build_view(repo, resolution.primary_id)
}

/// View of the cluster that contains `id`, whatever its precedence.
pub fn view_for<R: ContactRepo>(
  repo: &mut R,
  id: ContactId,
) -> Result<Option<IdentityView>, R::Error> {
  let Some(contact) = repo.get(id)? else {
    return Ok(None);
  };
  let root = resolve_root(repo, contact)?;
  build_view(repo, root.id).map(Some)
}

// ─── Matcher ─────────────────────────────────────────────────────────────────

/// Every contact sharing either identifier, in creation order.
pub fn find_matches<R: ContactRepo>(
  repo: &mut R,
  ids: &Identifiers,
) -> Result<Vec<Contact>, R::Error> {
  let mut matches = repo.find_by_identifier(ids)?;
  matches.sort_by_key(|c| c.id);
  tracing::debug!(matches = matches.len(), "matched existing contacts");
  Ok(matches)
}

// ─── Cluster merger ──────────────────────────────────────────────────────────

/// Merge every cluster touched by `matches` into the one with the oldest
/// primary, then record a secondary if `ids` brings anything new.
pub fn resolve_clusters<R: ContactRepo>(
  repo: &mut R,
  matches: &[Contact],
  ids: &Identifiers,
) -> Result<Resolution, R::Error> {
  let mut primaries: Vec<Contact> = Vec::new();
  for contact in matches {
    let root = resolve_root(repo, contact.clone())?;
    if !primaries.iter().any(|p| p.id == root.id) {
      primaries.push(root);
    }
  }
  primaries.sort_by_key(|c| c.id);

  let (oldest, newer) = primaries.split_first().ok_or(Error::NoPrimary)?;
  let primary_id = oldest.id;

  let mut demoted = Vec::with_capacity(newer.len());
  for former in newer {
    let members = collect_cluster(repo, former.id)?;
    repo.update(former.id, ContactUpdate::demote_to(primary_id))?;
    for member in members.iter().filter(|m| m.id != former.id) {
      repo.update(member.id, ContactUpdate::relink_to(primary_id))?;
    }
    tracing::info!(
      demoted = %former.id,
      into = %primary_id,
      relinked = members.len() - 1,
      "merged identity clusters"
    );
    demoted.push(former.id);
  }

  let cluster = collect_cluster(repo, primary_id)?;
  let is_new_email = ids
    .email()
    .is_some_and(|e| !cluster.iter().any(|c| c.email.as_deref() == Some(e)));
  let is_new_phone = ids
    .phone_number()
    .is_some_and(|p| !cluster.iter().any(|c| c.phone_number.as_deref() == Some(p)));

  let created = if is_new_email || is_new_phone {
    let contact = repo.create(NewContact::secondary(ids, primary_id))?;
    tracing::info!(
      contact_id = %contact.id,
      primary = %primary_id,
      new_email = is_new_email,
      new_phone = is_new_phone,
      "created secondary contact"
    );
    Some(contact)
  } else {
    None
  };

  Ok(Resolution { primary_id, demoted, created })
}

/// Walk `linked_id` links up to the cluster's primary.
fn resolve_root<R: ContactRepo>(repo: &mut R, contact: Contact) -> Result<Contact, R::Error> {
  let mut current = contact;
  let mut seen = HashSet::new();
  while let Some(parent) = current.linked_id {
    if !seen.insert(current.id) {
      return Err(Error::LinkCycle(current.id).into());
    }
    current = repo.get(parent)?.ok_or(Error::ContactNotFound(parent))?;
  }
  Ok(current)
}

/// `root` and all its descendants, in creation order.
fn collect_cluster<R: ContactRepo>(
  repo: &mut R,
  root: ContactId,
) -> Result<Vec<Contact>, R::Error> {
  let mut members = repo.find_by_cluster_root(root)?;
  if !members.iter().any(|c| c.id == root) {
    return Err(Error::ContactNotFound(root).into());
  }

  let mut seen: HashSet<ContactId> = members.iter().map(|c| c.id).collect();
  let mut frontier: Vec<ContactId> =
    members.iter().map(|c| c.id).filter(|id| *id != root).collect();

  while let Some(id) = frontier.pop() {
    for child in repo.find_by_cluster_root(id)? {
      if seen.insert(child.id) {
        frontier.push(child.id);
        members.push(child);
      }
    }
  }

  members.sort_by_key(|c| c.id);
  Ok(members)
}

// ─── View builder ────────────────────────────────────────────────────────────

/// Consolidated view of the cluster rooted at `primary_id`. Pure read.
pub fn build_view<R: ContactRepo>(
  repo: &mut R,
  primary_id: ContactId,
) -> Result<IdentityView, R::Error> {
  let members = collect_cluster(repo, primary_id)?;
  Ok(IdentityView::from_cluster(primary_id, &members))
}
