//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and dates as `YYYY-MM-DD`.
//! Structured fields (access, files, communities, metadata) are stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings, so their
//! text order is usable as a paging key.

use chrono::{DateTime, NaiveDate, Utc};
use rdm_core::{
  deletion::DeletionStatus,
  parent::Parent,
  record::{Draft, Record, VersionInfo},
  versions::VersionState,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Parse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

// ─── DeletionStatus ──────────────────────────────────────────────────────────

pub fn encode_deletion_status(s: DeletionStatus) -> String { s.code().to_string() }

pub fn decode_deletion_status(s: &str) -> Result<DeletionStatus> {
  let mut chars = s.chars();
  match (chars.next(), chars.next()) {
    (Some(c), None) => DeletionStatus::from_code(c),
    _ => None,
  }
  .ok_or_else(|| Error::Parse(format!("unknown deletion status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `parents` row.
pub struct RawParent {
  pub parent_id:   String,
  pub communities: String,
  pub access_json: String,
  pub created_at:  String,
  pub updated_at:  String,
  pub revision:    u32,
}

impl RawParent {
  pub const COLUMNS: &'static str =
    "parent_id, communities, access_json, created_at, updated_at, revision";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      parent_id:   row.get(0)?,
      communities: row.get(1)?,
      access_json: row.get(2)?,
      created_at:  row.get(3)?,
      updated_at:  row.get(4)?,
      revision:    row.get(5)?,
    })
  }

  pub fn encode(parent: &Parent) -> Result<Self> {
    Ok(Self {
      parent_id:   encode_uuid(parent.id),
      communities: serde_json::to_string(&parent.communities)?,
      access_json: serde_json::to_string(&parent.access)?,
      created_at:  encode_dt(parent.created_at),
      updated_at:  encode_dt(parent.updated_at),
      revision:    parent.revision,
    })
  }

  pub fn into_parent(self) -> Result<Parent> {
    Ok(Parent {
      id:          decode_uuid(&self.parent_id)?,
      communities: serde_json::from_str(&self.communities)?,
      access:      serde_json::from_str(&self.access_json)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
      revision:    self.revision,
    })
  }
}

/// Raw values read directly from a `versions_state` row.
pub struct RawVersionState {
  pub parent_id:    String,
  pub next_index:   u32,
  pub latest_id:    Option<String>,
  pub latest_index: Option<u32>,
  pub draft_id:     Option<String>,
  pub revision:     u32,
}

impl RawVersionState {
  pub const COLUMNS: &'static str =
    "parent_id, next_index, latest_id, latest_index, draft_id, revision";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      parent_id:    row.get(0)?,
      next_index:   row.get(1)?,
      latest_id:    row.get(2)?,
      latest_index: row.get(3)?,
      draft_id:     row.get(4)?,
      revision:     row.get(5)?,
    })
  }

  pub fn encode(state: &VersionState) -> Self {
    Self {
      parent_id:    encode_uuid(state.parent_id),
      next_index:   state.next_index,
      latest_id:    state.latest_id.map(encode_uuid),
      latest_index: state.latest_index,
      draft_id:     state.draft_id.map(encode_uuid),
      revision:     state.revision,
    }
  }

  pub fn into_state(self) -> Result<VersionState> {
    Ok(VersionState {
      parent_id:    decode_uuid(&self.parent_id)?,
      next_index:   self.next_index,
      latest_id:    decode_opt_uuid(self.latest_id)?,
      latest_index: self.latest_index,
      draft_id:     decode_opt_uuid(self.draft_id)?,
      revision:     self.revision,
    })
  }
}

/// Raw values read directly from a `records` row.
pub struct RawRecord {
  pub record_id:       String,
  pub parent_id:       String,
  pub version_index:   u32,
  pub metadata_json:   String,
  pub access_json:     String,
  pub files_json:      String,
  pub deletion_status: String,
  pub created_at:      String,
  pub updated_at:      String,
  pub revision:        u32,
}

impl RawRecord {
  pub const COLUMNS: &'static str = "record_id, parent_id, version_index, \
     metadata_json, access_json, files_json, deletion_status, created_at, \
     updated_at, revision";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:       row.get(0)?,
      parent_id:       row.get(1)?,
      version_index:   row.get(2)?,
      metadata_json:   row.get(3)?,
      access_json:     row.get(4)?,
      files_json:      row.get(5)?,
      deletion_status: row.get(6)?,
      created_at:      row.get(7)?,
      updated_at:      row.get(8)?,
      revision:        row.get(9)?,
    })
  }

  pub fn encode(record: &Record) -> Result<Self> {
    Ok(Self {
      record_id:       encode_uuid(record.id),
      parent_id:       encode_uuid(record.parent_id),
      version_index:   record.version.index,
      metadata_json:   serde_json::to_string(&record.metadata)?,
      access_json:     serde_json::to_string(&record.access)?,
      files_json:      serde_json::to_string(&record.files)?,
      deletion_status: encode_deletion_status(record.deletion_status),
      created_at:      encode_dt(record.created_at),
      updated_at:      encode_dt(record.updated_at),
      revision:        record.revision,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    Ok(Record {
      id:              decode_uuid(&self.record_id)?,
      parent_id:       decode_uuid(&self.parent_id)?,
      version:         VersionInfo { index: self.version_index },
      metadata:        serde_json::from_str(&self.metadata_json)?,
      access:          serde_json::from_str(&self.access_json)?,
      files:           serde_json::from_str(&self.files_json)?,
      deletion_status: decode_deletion_status(&self.deletion_status)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
      revision:        self.revision,
    })
  }
}

/// Raw values read directly from a `drafts` row.
pub struct RawDraft {
  pub draft_id:      String,
  pub parent_id:     String,
  pub record_id:     Option<String>,
  pub version_index: Option<u32>,
  pub metadata_json: String,
  pub access_json:   String,
  pub files_json:    String,
  pub created_at:    String,
  pub updated_at:    String,
  pub revision:      u32,
}

impl RawDraft {
  pub const COLUMNS: &'static str = "draft_id, parent_id, record_id, \
     version_index, metadata_json, access_json, files_json, created_at, \
     updated_at, revision";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      draft_id:      row.get(0)?,
      parent_id:     row.get(1)?,
      record_id:     row.get(2)?,
      version_index: row.get(3)?,
      metadata_json: row.get(4)?,
      access_json:   row.get(5)?,
      files_json:    row.get(6)?,
      created_at:    row.get(7)?,
      updated_at:    row.get(8)?,
      revision:      row.get(9)?,
    })
  }

  pub fn encode(draft: &Draft) -> Result<Self> {
    Ok(Self {
      draft_id:      encode_uuid(draft.id),
      parent_id:     encode_uuid(draft.parent_id),
      record_id:     draft.record_id.map(encode_uuid),
      version_index: draft.version.map(|v| v.index),
      metadata_json: serde_json::to_string(&draft.metadata)?,
      access_json:   serde_json::to_string(&draft.access)?,
      files_json:    serde_json::to_string(&draft.files)?,
      created_at:    encode_dt(draft.created_at),
      updated_at:    encode_dt(draft.updated_at),
      revision:      draft.revision,
    })
  }

  pub fn into_draft(self) -> Result<Draft> {
    Ok(Draft {
      id:         decode_uuid(&self.draft_id)?,
      parent_id:  decode_uuid(&self.parent_id)?,
      record_id:  decode_opt_uuid(self.record_id)?,
      version:    self.version_index.map(|index| VersionInfo { index }),
      metadata:   serde_json::from_str(&self.metadata_json)?,
      access:     serde_json::from_str(&self.access_json)?,
      files:      serde_json::from_str(&self.files_json)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      revision:   self.revision,
    })
  }
}

/// The search-index mirror row for a record or draft.
pub struct IndexRow {
  pub entity_kind:     &'static str,
  pub entity_id:       String,
  pub parent_id:       String,
  pub embargo_active:  bool,
  pub embargo_until:   Option<String>,
  pub deletion_status: Option<String>,
  pub document:        String,
  pub indexed_at:      String,
}

impl IndexRow {
  pub const RECORD: &'static str = "record";
  pub const DRAFT: &'static str = "draft";

  pub fn for_record(record: &Record) -> Result<Self> {
    Ok(Self {
      entity_kind:     Self::RECORD,
      entity_id:       encode_uuid(record.id),
      parent_id:       encode_uuid(record.parent_id),
      embargo_active:  record.access.embargo.active,
      embargo_until:   record.access.embargo.until.map(encode_date),
      deletion_status: Some(encode_deletion_status(record.deletion_status)),
      document:        serde_json::to_string(record)?,
      indexed_at:      encode_dt(Utc::now()),
    })
  }

  pub fn for_draft(draft: &Draft) -> Result<Self> {
    Ok(Self {
      entity_kind:     Self::DRAFT,
      entity_id:       encode_uuid(draft.id),
      parent_id:       encode_uuid(draft.parent_id),
      embargo_active:  draft.access.embargo.active,
      embargo_until:   draft.access.embargo.until.map(encode_date),
      deletion_status: None,
      document:        serde_json::to_string(draft)?,
      indexed_at:      encode_dt(Utc::now()),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deletion_status_codes() {
    assert_eq!(encode_deletion_status(DeletionStatus::MarkedForPurge), "X");
    assert_eq!(
      decode_deletion_status("D").unwrap(),
      DeletionStatus::Deleted
    );
    assert!(decode_deletion_status("PD").is_err());
    assert!(decode_deletion_status("").is_err());
  }

  #[test]
  fn dates_sort_as_text() {
    let early = encode_date(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
    let late = encode_date(NaiveDate::from_ymd_opt(3220, 6, 1).unwrap());
    assert_eq!(early, "2024-01-09");
    assert!(early < late);
  }
}
