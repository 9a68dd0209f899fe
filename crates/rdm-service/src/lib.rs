//! The record lifecycle service.
//!
//! [`RecordService`] orchestrates drafts, publication, versions, access
//! changes and deletion on top of any [`RecordStore`]. Every operation
//! follows the same shape: load the entities it touches, ask the
//! [`PermissionPolicy`], mutate in memory, then register the changes on one
//! [`UnitOfWork`] and commit it. Nothing is written until every check has
//! passed, so a failed operation leaves the store as it was.

pub mod access;
pub mod deletion;
pub mod drafts;
pub mod item;
pub mod scan;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rdm_core::{
  EntityKind, Error, Result,
  config::ServiceConfig,
  parent::Parent,
  permission::{GrantPolicy, PermissionPolicy},
  record::{Draft, Record},
  store::{RecordStore, UnitOfWork},
  versions::VersionState,
};
use uuid::Uuid;

pub use item::{DraftItem, RecordItem};
pub use scan::ExpiredEmbargoScan;

/// Lifecycle operations over a record store.
///
/// `S::Error` must convert into [`rdm_core::Error`] so that store conflicts
/// surface as [`Error::Conflict`].
pub struct RecordService<S, P = GrantPolicy> {
  store:  Arc<S>,
  policy: P,
  config: ServiceConfig,
}

impl<S> RecordService<S> {
  /// A service using the default [`GrantPolicy`].
  pub fn new(store: Arc<S>, config: ServiceConfig) -> Self {
    Self::with_policy(store, GrantPolicy, config)
  }
}

impl<S, P> RecordService<S, P> {
  pub fn with_policy(store: Arc<S>, policy: P, config: ServiceConfig) -> Self {
    Self { store, policy, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &ServiceConfig { &self.config }
}

impl<S, P> RecordService<S, P>
where
  S: RecordStore,
  P: PermissionPolicy,
  Error: From<S::Error>,
{
  // ─── Loading ──────────────────────────────────────────────────────────────

  async fn load_parent(&self, id: Uuid) -> Result<Parent> {
    self
      .store
      .get_parent(id)
      .await?
      .ok_or_else(|| Error::not_found(EntityKind::Parent, id))
  }

  async fn load_record(&self, id: Uuid) -> Result<Record> {
    self
      .store
      .get_record(id)
      .await?
      .ok_or_else(|| Error::not_found(EntityKind::Record, id))
  }

  async fn load_draft(&self, id: Uuid) -> Result<Draft> {
    self
      .store
      .get_draft(id)
      .await?
      .ok_or_else(|| Error::not_found(EntityKind::Draft, id))
  }

  async fn load_state(&self, parent_id: Uuid) -> Result<VersionState> {
    self
      .store
      .get_version_state(parent_id)
      .await?
      .ok_or_else(|| Error::not_found(EntityKind::VersionState, parent_id))
  }

  async fn commit(&self, uow: UnitOfWork) -> Result<()> {
    let ops = uow.len();
    self.store.commit(uow).await?;
    tracing::debug!(ops, "committed unit of work");
    Ok(())
  }
}

/// The current day in UTC, used for embargo comparisons.
pub(crate) fn today() -> NaiveDate { Utc::now().date_naive() }
