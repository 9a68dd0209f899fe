//! The `RecordStore` trait, the unit of work it commits, and the index query
//! type.
//!
//! The trait is implemented by storage backends (e.g. `rdm-store-sqlite`).
//! The lifecycle service depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  deletion::DeletionStatus,
  parent::Parent,
  record::{Draft, Record},
  versions::VersionState,
};

// ─── Unit of work ────────────────────────────────────────────────────────────

/// One registered mutation.
///
/// Puts carry the entity with its revision already bumped; the store applies
/// them only if the stored revision is exactly one lower (or absent when the
/// entity's revision is 1). Deletes carry the revision the caller last read.
#[derive(Debug, Clone)]
pub enum Op {
  PutParent(Parent),
  PutVersionState(VersionState),
  PutRecord(Record),
  PutDraft(Draft),
  DeleteDraft { id: Uuid, revision: u32 },
  DeleteRecord { id: Uuid, revision: u32 },
}

/// Mutations collected by one service operation and committed together.
///
/// Nothing touches the store until [`RecordStore::commit`]; dropping a unit
/// of work discards it.
#[derive(Debug, Default)]
pub struct UnitOfWork {
  ops: Vec<Op>,
}

impl UnitOfWork {
  pub fn new() -> Self { Self::default() }

  pub fn put_parent(&mut self, parent: &mut Parent) {
    parent.revision += 1;
    parent.updated_at = Utc::now();
    self.ops.push(Op::PutParent(parent.clone()));
  }

  pub fn put_version_state(&mut self, state: &mut VersionState) {
    state.revision += 1;
    self.ops.push(Op::PutVersionState(state.clone()));
  }

  pub fn put_record(&mut self, record: &mut Record) {
    record.revision += 1;
    record.updated_at = Utc::now();
    self.ops.push(Op::PutRecord(record.clone()));
  }

  pub fn put_draft(&mut self, draft: &mut Draft) {
    draft.revision += 1;
    draft.updated_at = Utc::now();
    self.ops.push(Op::PutDraft(draft.clone()));
  }

  pub fn delete_draft(&mut self, draft: &Draft) {
    self.ops.push(Op::DeleteDraft { id: draft.id, revision: draft.revision });
  }

  pub fn delete_record(&mut self, record: &Record) {
    self
      .ops
      .push(Op::DeleteRecord { id: record.id, revision: record.revision });
  }

  pub fn is_empty(&self) -> bool { self.ops.is_empty() }

  pub fn len(&self) -> usize { self.ops.len() }

  pub fn ops(&self) -> &[Op] { &self.ops }

  pub fn into_ops(self) -> Vec<Op> { self.ops }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// A filter over the search-index mirror of published records, paged by
/// record id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
  pub parent_id:         Option<Uuid>,
  pub embargo_active:    Option<bool>,
  /// Only records whose embargo date is on or before this day.
  pub embargo_until_lte: Option<NaiveDate>,
  pub deletion_status:   Option<DeletionStatus>,
  /// Keyset cursor: only records with an id greater than this one.
  pub after:             Option<Uuid>,
  pub limit:             Option<usize>,
}

impl RecordQuery {
  /// Records whose embargo is active and due on or before `today`.
  pub fn expired_embargos(today: NaiveDate) -> Self {
    Self {
      embargo_active: Some(true),
      embargo_until_lte: Some(today),
      ..Self::default()
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a record store backend.
///
/// Reads return the last committed state. All writes go through
/// [`commit`](RecordStore::commit), which applies a [`UnitOfWork`] atomically
/// together with the search-index mirror, or not at all.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_parent(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Parent>, Self::Error>> + Send + '_;

  fn get_version_state(
    &self,
    parent_id: Uuid,
  ) -> impl Future<Output = Result<Option<VersionState>, Self::Error>> + Send + '_;

  fn get_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  fn get_draft(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Draft>, Self::Error>> + Send + '_;

  /// All records of a parent, ordered by version index.
  fn list_records(
    &self,
    parent_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;

  /// The parent holding a secret link with this token, if any.
  fn find_parent_by_link<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<Parent>, Self::Error>> + Send + 'a;

  // ── Index ─────────────────────────────────────────────────────────────

  /// Query the search-index mirror. Results are ordered by record id so
  /// `query.after` can page through them.
  fn search<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Apply every operation in `uow` atomically. A revision mismatch on any
  /// entity aborts the whole unit with a conflict.
  fn commit(
    &self,
    uow: UnitOfWork,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
