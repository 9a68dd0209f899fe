//! Records and drafts: the published and editable forms of one version.
//!
//! Both are plain structs composed of named parts ([`VersionInfo`],
//! [`RecordAccess`], [`FileRefs`]). Each references exactly one
//! [`Parent`](crate::parent::Parent).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  access::{RecordAccess, load_access},
  deletion::DeletionStatus,
};

// ─── Parts ───────────────────────────────────────────────────────────────────

/// Position of a version within its lineage. Assigned at publish time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
  /// 1-based version number; fixed once assigned.
  pub index: u32,
}

/// References to the file buckets of a version. Bucket contents are managed
/// elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileRefs {
  #[serde(default)]
  pub enabled:         bool,
  #[serde(default)]
  pub bucket_id:       Option<Uuid>,
  #[serde(default)]
  pub media_bucket_id: Option<Uuid>,
}

impl FileRefs {
  /// A fresh set of buckets for a new version.
  pub fn fresh(enabled: bool) -> Self {
    Self {
      enabled,
      bucket_id: enabled.then(Uuid::new_v4),
      media_bucket_id: enabled.then(Uuid::new_v4),
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A published version. Metadata and version are fixed after publication;
/// only access and deletion status change, through validated transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub id:              Uuid,
  pub parent_id:       Uuid,
  pub version:         VersionInfo,
  /// Opaque to this crate.
  pub metadata:        serde_json::Value,
  pub access:          RecordAccess,
  pub files:           FileRefs,
  pub deletion_status: DeletionStatus,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
  /// Optimistic-lock counter; 0 means not yet persisted.
  pub revision:        u32,
}

impl Record {
  /// Publish `draft` as a brand-new record with version `index`.
  pub fn from_draft(draft: &Draft, index: u32) -> Self {
    let now = Utc::now();
    Self {
      id:              draft.id,
      parent_id:       draft.parent_id,
      version:         VersionInfo { index },
      metadata:        draft.metadata.clone(),
      access:          draft.access.clone(),
      files:           draft.files,
      deletion_status: DeletionStatus::Published,
      created_at:      now,
      updated_at:      now,
      revision:        0,
    }
  }

  /// Copy the editable state of an edit draft back onto this record.
  pub fn apply_draft(&mut self, draft: &Draft) {
    self.metadata = draft.metadata.clone();
    self.access = draft.access.clone();
    self.files = draft.files;
    self.updated_at = Utc::now();
  }
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// An editable version. A draft editing a published record shares that
/// record's id; a first or new-version draft has its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
  pub id:         Uuid,
  pub parent_id:  Uuid,
  /// The published record this draft edits, if any.
  pub record_id:  Option<Uuid>,
  /// Present only for edit drafts; new versions get a number at publish.
  pub version:    Option<VersionInfo>,
  pub metadata:   serde_json::Value,
  pub access:     RecordAccess,
  pub files:      FileRefs,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub revision:   u32,
}

/// Client-editable content of a draft.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DraftInput {
  #[serde(default)]
  pub metadata:      serde_json::Value,
  #[serde(default)]
  pub access:        RecordAccess,
  #[serde(default)]
  pub files_enabled: bool,
}

impl DraftInput {
  /// Parse client JSON. Access is validated; metadata is taken as-is.
  pub fn from_json(mut value: serde_json::Value) -> Result<Self> {
    let access = value
      .get_mut("access")
      .map(serde_json::Value::take)
      .map(load_access)
      .transpose()?
      .unwrap_or_default();
    let metadata = value
      .get_mut("metadata")
      .map(serde_json::Value::take)
      .unwrap_or_default();
    let files_enabled = value
      .get("files_enabled")
      .and_then(serde_json::Value::as_bool)
      .unwrap_or(false);
    Ok(Self { metadata, access, files_enabled })
  }
}

impl Draft {
  /// The first draft of a new lineage.
  pub fn new(parent_id: Uuid, input: DraftInput) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      parent_id,
      record_id: None,
      version: None,
      metadata: input.metadata,
      access: input.access,
      files: FileRefs::fresh(input.files_enabled),
      created_at: now,
      updated_at: now,
      revision: 0,
    }
  }

  /// A draft that edits `record` in place.
  pub fn for_edit(record: &Record) -> Self {
    let now = Utc::now();
    Self {
      id:         record.id,
      parent_id:  record.parent_id,
      record_id:  Some(record.id),
      version:    Some(record.version),
      metadata:   record.metadata.clone(),
      access:     record.access.clone(),
      files:      record.files,
      created_at: now,
      updated_at: now,
      revision:   0,
    }
  }

  /// A draft for the next version after `record`. Metadata and access carry
  /// over; files start from empty buckets.
  pub fn for_new_version(record: &Record) -> Self {
    let now = Utc::now();
    Self {
      id:         Uuid::new_v4(),
      parent_id:  record.parent_id,
      record_id:  None,
      version:    None,
      metadata:   record.metadata.clone(),
      access:     record.access.clone(),
      files:      FileRefs::fresh(record.files.enabled),
      created_at: now,
      updated_at: now,
      revision:   0,
    }
  }

  /// Whether publishing this draft updates an existing record.
  pub fn is_edit(&self) -> bool { self.record_id.is_some() }

  pub fn apply_input(&mut self, input: DraftInput) {
    self.metadata = input.metadata;
    self.access = input.access;
    if input.files_enabled != self.files.enabled {
      self.files = FileRefs::fresh(input.files_enabled);
    }
    self.updated_at = Utc::now();
  }
}
