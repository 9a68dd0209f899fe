//! Deletion-status transitions and purging.

use rdm_core::{
  Error, Result,
  deletion::DeletionStatus,
  identity::Identity,
  permission::{Action, PermissionPolicy, Resource},
  record::Record,
  store::{RecordStore, UnitOfWork},
};
use uuid::Uuid;

use crate::RecordService;

impl<S, P> RecordService<S, P>
where
  S: RecordStore,
  P: PermissionPolicy,
  Error: From<S::Error>,
{
  /// `P → D`.
  pub async fn delete_record(&self, identity: &Identity, record_id: Uuid) -> Result<Record> {
    self
      .transition(identity, record_id, Action::Delete, DeletionStatus::Deleted)
      .await
  }

  /// `D → P`.
  pub async fn restore_record(&self, identity: &Identity, record_id: Uuid) -> Result<Record> {
    self
      .transition(identity, record_id, Action::Restore, DeletionStatus::Published)
      .await
  }

  /// `D → X`.
  pub async fn mark_for_purge(&self, identity: &Identity, record_id: Uuid) -> Result<Record> {
    self
      .transition(identity, record_id, Action::Purge, DeletionStatus::MarkedForPurge)
      .await
  }

  /// Remove a record that is marked for purge. If it was the latest version
  /// the parent's latest pointer falls back to the highest remaining one.
  pub async fn purge_record(&self, identity: &Identity, record_id: Uuid) -> Result<()> {
    let record = self.load_record(record_id).await?;
    let parent = self.load_parent(record.parent_id).await?;

    let resource = Resource::Record { parent: &parent, access: &record.access };
    self.policy.check(identity, Action::Purge, &resource)?;
    if record.deletion_status != DeletionStatus::MarkedForPurge {
      return Err(Error::InvalidStateTransition {
        from: record.deletion_status,
        to:   DeletionStatus::MarkedForPurge,
      });
    }

    let mut state = self.load_state(parent.id).await?;
    let mut uow = UnitOfWork::new();

    // An edit draft of the purged record goes with it.
    if state.draft_id == Some(record.id) {
      if let Some(draft) = self.store.get_draft(record.id).await? {
        state.discard_draft(draft.id)?;
        uow.delete_draft(&draft);
      }
    }

    if state.is_latest(record.id) {
      let remaining = self.store.list_records(parent.id).await?;
      state.rollback_latest(
        remaining
          .iter()
          .filter(|r| r.id != record.id)
          .map(|r| (r.id, r.version.index)),
      );
    }

    uow.delete_record(&record);
    uow.put_version_state(&mut state);
    self.commit(uow).await?;

    tracing::info!(
      record_id = %record.id,
      parent_id = %parent.id,
      latest = ?state.latest_index,
      "purged record"
    );
    Ok(())
  }

  async fn transition(
    &self,
    identity: &Identity,
    record_id: Uuid,
    action: Action,
    to: DeletionStatus,
  ) -> Result<Record> {
    let mut record = self.load_record(record_id).await?;
    let parent = self.load_parent(record.parent_id).await?;

    let resource = Resource::Record { parent: &parent, access: &record.access };
    self.policy.check(identity, action, &resource)?;

    let from = record.deletion_status;
    record.deletion_status = from.transition(to)?;

    let mut uow = UnitOfWork::new();
    uow.put_record(&mut record);
    self.commit(uow).await?;

    tracing::info!(record_id = %record.id, %from, %to, "changed deletion status");
    Ok(record)
  }
}
