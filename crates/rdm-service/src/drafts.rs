//! Drafts, publication and reads.

use rdm_core::{
  EntityKind, Error, Result,
  identity::Identity,
  parent::{Owner, Parent},
  permission::{Action, PermissionPolicy, Resource},
  record::{Draft, DraftInput, FileRefs, Record},
  store::{RecordStore, UnitOfWork},
  versions::VersionState,
};
use uuid::Uuid;

use crate::{DraftItem, RecordItem, RecordService};

impl<S, P> RecordService<S, P>
where
  S: RecordStore,
  P: PermissionPolicy,
  Error: From<S::Error>,
{
  // ─── Create ───────────────────────────────────────────────────────────────

  /// Start a new lineage: a parent owned by the caller, its version state,
  /// and the first draft.
  pub async fn create(&self, identity: &Identity, input: DraftInput) -> Result<Draft> {
    self.policy.check(identity, Action::Create, &Resource::Global)?;
    input.access.validate()?;

    let mut parent = Parent::new();
    parent.access.owned_by = identity.user_id.clone().map(|user| Owner { user });
    let mut state = VersionState::new(parent.id);
    let mut draft = Draft::new(parent.id, input);
    state.open_draft(draft.id)?;

    let mut uow = UnitOfWork::new();
    uow.put_parent(&mut parent);
    uow.put_version_state(&mut state);
    uow.put_draft(&mut draft);
    self.commit(uow).await?;

    tracing::info!(draft_id = %draft.id, parent_id = %parent.id, "created draft");
    Ok(draft)
  }

  // ─── Reads ────────────────────────────────────────────────────────────────

  /// Read a record. Records that are no longer published are only visible to
  /// callers who manage the parent.
  pub async fn read(&self, identity: &Identity, record_id: Uuid) -> Result<RecordItem> {
    let record = self.load_record(record_id).await?;
    let parent = self.load_parent(record.parent_id).await?;

    let action = if record.deletion_status.is_published() {
      Action::Read
    } else {
      Action::Manage
    };
    let resource = Resource::Record { parent: &parent, access: &record.access };
    self.policy.check(identity, action, &resource)?;

    let can_manage = self.policy.allows(identity, Action::Manage, &Resource::Parent(&parent));
    Ok(RecordItem { record, parent, can_manage })
  }

  /// The file buckets of a record, for file and image consumers.
  pub async fn read_files(&self, identity: &Identity, record_id: Uuid) -> Result<FileRefs> {
    let record = self.load_record(record_id).await?;
    let parent = self.load_parent(record.parent_id).await?;
    if !record.deletion_status.is_published() {
      return Err(Error::not_found(EntityKind::Record, record_id));
    }

    let resource = Resource::Record { parent: &parent, access: &record.access };
    self.policy.check(identity, Action::ReadFiles, &resource)?;
    Ok(record.files)
  }

  pub async fn read_draft(&self, identity: &Identity, draft_id: Uuid) -> Result<DraftItem> {
    let draft = self.load_draft(draft_id).await?;
    let parent = self.load_parent(draft.parent_id).await?;

    let resource = Resource::Record { parent: &parent, access: &draft.access };
    self.policy.check(identity, Action::ReadDraft, &resource)?;

    let can_manage = self.policy.allows(identity, Action::Manage, &Resource::Parent(&parent));
    Ok(DraftItem { draft, parent, can_manage })
  }

  /// Every published version of the record's lineage the caller may read,
  /// ordered by version index.
  pub async fn list_versions(&self, identity: &Identity, record_id: Uuid) -> Result<Vec<Record>> {
    let record = self.load_record(record_id).await?;
    let parent = self.load_parent(record.parent_id).await?;

    let records = self.store.list_records(parent.id).await?;
    Ok(
      records
        .into_iter()
        .filter(|r| r.deletion_status.is_published())
        .filter(|r| {
          let resource = Resource::Record { parent: &parent, access: &r.access };
          self.policy.allows(identity, Action::Read, &resource)
        })
        .collect(),
    )
  }

  // ─── Draft editing ────────────────────────────────────────────────────────

  pub async fn update_draft(
    &self,
    identity: &Identity,
    draft_id: Uuid,
    input: DraftInput,
  ) -> Result<Draft> {
    let mut draft = self.load_draft(draft_id).await?;
    let parent = self.load_parent(draft.parent_id).await?;

    let resource = Resource::Record { parent: &parent, access: &draft.access };
    self.policy.check(identity, Action::UpdateDraft, &resource)?;
    input.access.validate()?;

    draft.apply_input(input);
    let mut uow = UnitOfWork::new();
    uow.put_draft(&mut draft);
    self.commit(uow).await?;

    tracing::debug!(draft_id = %draft.id, revision = draft.revision, "updated draft");
    Ok(draft)
  }

  /// Open an edit draft for a published record. The draft shares the
  /// record's id and version number.
  pub async fn edit(&self, identity: &Identity, record_id: Uuid) -> Result<Draft> {
    let record = self.load_record(record_id).await?;
    let parent = self.load_parent(record.parent_id).await?;

    let resource = Resource::Record { parent: &parent, access: &record.access };
    self.policy.check(identity, Action::Edit, &resource)?;
    if !record.deletion_status.is_published() {
      return Err(Error::Validation(format!(
        "record {record_id} is {} and cannot be edited",
        record.deletion_status
      )));
    }

    let mut state = self.load_state(parent.id).await?;
    let mut draft = Draft::for_edit(&record);
    state.open_draft(draft.id)?;

    let mut uow = UnitOfWork::new();
    uow.put_version_state(&mut state);
    uow.put_draft(&mut draft);
    self.commit(uow).await?;

    tracing::info!(record_id = %record.id, "opened edit draft");
    Ok(draft)
  }

  /// Open a draft for the next version after `record_id`. Metadata and access
  /// carry over; files start empty.
  pub async fn new_version(&self, identity: &Identity, record_id: Uuid) -> Result<Draft> {
    let record = self.load_record(record_id).await?;
    let parent = self.load_parent(record.parent_id).await?;

    let resource = Resource::Record { parent: &parent, access: &record.access };
    self.policy.check(identity, Action::NewVersion, &resource)?;
    if !record.deletion_status.is_published() {
      return Err(Error::Validation(format!(
        "record {record_id} is {} and cannot start a new version",
        record.deletion_status
      )));
    }

    let mut state = self.load_state(parent.id).await?;
    let mut draft = Draft::for_new_version(&record);
    state.open_draft(draft.id)?;

    let mut uow = UnitOfWork::new();
    uow.put_version_state(&mut state);
    uow.put_draft(&mut draft);
    self.commit(uow).await?;

    tracing::info!(draft_id = %draft.id, parent_id = %parent.id, "opened new version draft");
    Ok(draft)
  }

  // ─── Publish / discard ────────────────────────────────────────────────────

  /// Publish the open draft. A first or new-version draft becomes a new
  /// record with the next version number; an edit draft overwrites the
  /// record it edits. The draft is removed either way.
  pub async fn publish(&self, identity: &Identity, draft_id: Uuid) -> Result<Record> {
    let draft = self.load_draft(draft_id).await?;
    let parent = self.load_parent(draft.parent_id).await?;

    let resource = Resource::Record { parent: &parent, access: &draft.access };
    self.policy.check(identity, Action::Publish, &resource)?;
    draft.access.validate()?;

    let mut state = self.load_state(parent.id).await?;
    let index = state.publish(&draft)?;

    let mut record = match draft.record_id {
      Some(record_id) => {
        let mut record = self.load_record(record_id).await?;
        record.apply_draft(&draft);
        record
      }
      None => Record::from_draft(&draft, index),
    };

    let mut uow = UnitOfWork::new();
    uow.put_record(&mut record);
    uow.delete_draft(&draft);
    uow.put_version_state(&mut state);
    self.commit(uow).await?;

    tracing::info!(
      record_id = %record.id,
      parent_id = %parent.id,
      index,
      edit = draft.is_edit(),
      "published record"
    );
    Ok(record)
  }

  /// Throw away the open draft. No version number is consumed.
  pub async fn discard(&self, identity: &Identity, draft_id: Uuid) -> Result<()> {
    let draft = self.load_draft(draft_id).await?;
    let parent = self.load_parent(draft.parent_id).await?;

    let resource = Resource::Record { parent: &parent, access: &draft.access };
    self.policy.check(identity, Action::DiscardDraft, &resource)?;

    let mut state = self.load_state(parent.id).await?;
    state.discard_draft(draft.id)?;

    let mut uow = UnitOfWork::new();
    uow.delete_draft(&draft);
    uow.put_version_state(&mut state);
    self.commit(uow).await?;

    tracing::info!(draft_id = %draft.id, "discarded draft");
    Ok(())
  }
}
