//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, Transaction};
use uuid::Uuid;

use rdm_core::{
  parent::Parent,
  record::{Draft, Record},
  store::{Op, RecordQuery, RecordStore, UnitOfWork},
  versions::VersionState,
};

use crate::{
  encode::{
    encode_date, encode_deletion_status, encode_uuid, IndexRow, RawDraft, RawParent,
    RawRecord, RawVersionState,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// run on the connection's own thread, so each commit is one uninterrupted
/// transaction.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Commit ──────────────────────────────────────────────────────────────────

/// A unit-of-work operation, encoded and ready to run on the database thread.
enum Write {
  Parent(RawParent),
  VersionState(RawVersionState),
  Record(RawRecord, IndexRow),
  Draft(RawDraft, IndexRow),
  DeleteDraft { id: String, revision: u32 },
  DeleteRecord { id: String, revision: u32 },
}

impl Write {
  fn encode(op: Op) -> Result<Self> {
    Ok(match op {
      Op::PutParent(p) => Self::Parent(RawParent::encode(&p)?),
      Op::PutVersionState(s) => Self::VersionState(RawVersionState::encode(&s)),
      Op::PutRecord(r) => Self::Record(RawRecord::encode(&r)?, IndexRow::for_record(&r)?),
      Op::PutDraft(d) => Self::Draft(RawDraft::encode(&d)?, IndexRow::for_draft(&d)?),
      Op::DeleteDraft { id, revision } => Self::DeleteDraft { id: encode_uuid(id), revision },
      Op::DeleteRecord { id, revision } => {
        Self::DeleteRecord { id: encode_uuid(id), revision }
      }
    })
  }

  /// Run this write inside `tx`. Returns a description of the conflict if the
  /// optimistic revision check failed.
  fn apply(&self, tx: &Transaction<'_>) -> rusqlite::Result<Option<String>> {
    let (changed, what) = match self {
      Self::Parent(p) => (put_parent(tx, p)?, format!("parent {}", p.parent_id)),
      Self::VersionState(s) => {
        (put_version_state(tx, s)?, format!("version state of {}", s.parent_id))
      }
      Self::Record(r, index) => {
        let changed = put_record(tx, r)?;
        if changed {
          upsert_index(tx, index)?;
        }
        (changed, format!("record {}", r.record_id))
      }
      Self::Draft(d, index) => {
        let changed = put_draft(tx, d)?;
        if changed {
          upsert_index(tx, index)?;
        }
        (changed, format!("draft {}", d.draft_id))
      }
      Self::DeleteDraft { id, revision } => {
        let n = tx.execute(
          "DELETE FROM drafts WHERE draft_id = ?1 AND revision = ?2",
          rusqlite::params![id, revision],
        )?;
        remove_index(tx, IndexRow::DRAFT, id)?;
        (n == 1, format!("draft {id}"))
      }
      Self::DeleteRecord { id, revision } => {
        let n = tx.execute(
          "DELETE FROM records WHERE record_id = ?1 AND revision = ?2",
          rusqlite::params![id, revision],
        )?;
        remove_index(tx, IndexRow::RECORD, id)?;
        (n == 1, format!("record {id}"))
      }
    };

    Ok((!changed).then(|| format!("{what} was modified concurrently")))
  }
}

fn put_parent(tx: &Transaction<'_>, p: &RawParent) -> rusqlite::Result<bool> {
  let n = if p.revision == 1 {
    tx.execute(
      "INSERT INTO parents (parent_id, communities, access_json, created_at, updated_at, revision)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT DO NOTHING",
      rusqlite::params![
        p.parent_id,
        p.communities,
        p.access_json,
        p.created_at,
        p.updated_at,
        p.revision,
      ],
    )?
  } else {
    tx.execute(
      "UPDATE parents
       SET communities = ?2, access_json = ?3, updated_at = ?4, revision = ?5
       WHERE parent_id = ?1 AND revision = ?5 - 1",
      rusqlite::params![
        p.parent_id,
        p.communities,
        p.access_json,
        p.updated_at,
        p.revision,
      ],
    )?
  };
  Ok(n == 1)
}

fn put_version_state(tx: &Transaction<'_>, s: &RawVersionState) -> rusqlite::Result<bool> {
  let n = if s.revision == 1 {
    tx.execute(
      "INSERT INTO versions_state
         (parent_id, next_index, latest_id, latest_index, draft_id, revision)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT DO NOTHING",
      rusqlite::params![
        s.parent_id,
        s.next_index,
        s.latest_id,
        s.latest_index,
        s.draft_id,
        s.revision,
      ],
    )?
  } else {
    tx.execute(
      "UPDATE versions_state
       SET next_index = ?2, latest_id = ?3, latest_index = ?4, draft_id = ?5,
           revision = ?6
       WHERE parent_id = ?1 AND revision = ?6 - 1",
      rusqlite::params![
        s.parent_id,
        s.next_index,
        s.latest_id,
        s.latest_index,
        s.draft_id,
        s.revision,
      ],
    )?
  };
  Ok(n == 1)
}

fn put_record(tx: &Transaction<'_>, r: &RawRecord) -> rusqlite::Result<bool> {
  let n = if r.revision == 1 {
    tx.execute(
      "INSERT INTO records (
         record_id, parent_id, version_index, metadata_json, access_json,
         files_json, deletion_status, created_at, updated_at, revision
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
       ON CONFLICT DO NOTHING",
      rusqlite::params![
        r.record_id,
        r.parent_id,
        r.version_index,
        r.metadata_json,
        r.access_json,
        r.files_json,
        r.deletion_status,
        r.created_at,
        r.updated_at,
        r.revision,
      ],
    )?
  } else {
    // parent_id and version_index are fixed at creation.
    tx.execute(
      "UPDATE records
       SET metadata_json = ?2, access_json = ?3, files_json = ?4,
           deletion_status = ?5, updated_at = ?6, revision = ?7
       WHERE record_id = ?1 AND revision = ?7 - 1",
      rusqlite::params![
        r.record_id,
        r.metadata_json,
        r.access_json,
        r.files_json,
        r.deletion_status,
        r.updated_at,
        r.revision,
      ],
    )?
  };
  Ok(n == 1)
}

fn put_draft(tx: &Transaction<'_>, d: &RawDraft) -> rusqlite::Result<bool> {
  // The unique index on drafts(parent_id) turns a second open draft into a
  // no-op insert, which is reported as a conflict.
  let n = if d.revision == 1 {
    tx.execute(
      "INSERT INTO drafts (
         draft_id, parent_id, record_id, version_index, metadata_json,
         access_json, files_json, created_at, updated_at, revision
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
       ON CONFLICT DO NOTHING",
      rusqlite::params![
        d.draft_id,
        d.parent_id,
        d.record_id,
        d.version_index,
        d.metadata_json,
        d.access_json,
        d.files_json,
        d.created_at,
        d.updated_at,
        d.revision,
      ],
    )?
  } else {
    tx.execute(
      "UPDATE drafts
       SET metadata_json = ?2, access_json = ?3, files_json = ?4,
           updated_at = ?5, revision = ?6
       WHERE draft_id = ?1 AND revision = ?6 - 1",
      rusqlite::params![
        d.draft_id,
        d.metadata_json,
        d.access_json,
        d.files_json,
        d.updated_at,
        d.revision,
      ],
    )?
  };
  Ok(n == 1)
}

fn upsert_index(tx: &Transaction<'_>, row: &IndexRow) -> rusqlite::Result<()> {
  tx.execute(
    "INSERT INTO search_index (
       entity_kind, entity_id, parent_id, embargo_active, embargo_until,
       deletion_status, document, indexed_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT (entity_kind, entity_id) DO UPDATE SET
       parent_id       = excluded.parent_id,
       embargo_active  = excluded.embargo_active,
       embargo_until   = excluded.embargo_until,
       deletion_status = excluded.deletion_status,
       document        = excluded.document,
       indexed_at      = excluded.indexed_at",
    rusqlite::params![
      row.entity_kind,
      row.entity_id,
      row.parent_id,
      row.embargo_active,
      row.embargo_until,
      row.deletion_status,
      row.document,
      row.indexed_at,
    ],
  )?;
  Ok(())
}

fn remove_index(tx: &Transaction<'_>, kind: &str, id: &str) -> rusqlite::Result<()> {
  tx.execute(
    "DELETE FROM search_index WHERE entity_kind = ?1 AND entity_id = ?2",
    rusqlite::params![kind, id],
  )?;
  Ok(())
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn get_parent(&self, id: Uuid) -> Result<Option<Parent>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawParent> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM parents WHERE parent_id = ?1", RawParent::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawParent::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawParent::into_parent).transpose()
  }

  async fn get_version_state(&self, parent_id: Uuid) -> Result<Option<VersionState>> {
    let id_str = encode_uuid(parent_id);

    let raw: Option<RawVersionState> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM versions_state WHERE parent_id = ?1",
          RawVersionState::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawVersionState::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVersionState::into_state).transpose()
  }

  async fn get_record(&self, id: Uuid) -> Result<Option<Record>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM records WHERE record_id = ?1", RawRecord::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawRecord::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn get_draft(&self, id: Uuid) -> Result<Option<Draft>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDraft> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM drafts WHERE draft_id = ?1", RawDraft::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawDraft::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDraft::into_draft).transpose()
  }

  async fn list_records(&self, parent_id: Uuid) -> Result<Vec<Record>> {
    let id_str = encode_uuid(parent_id);

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM records WHERE parent_id = ?1 ORDER BY version_index",
          RawRecord::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn find_parent_by_link(&self, token: &str) -> Result<Option<Parent>> {
    let token = token.to_owned();

    let raw: Option<RawParent> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM parents
           WHERE EXISTS (
             SELECT 1 FROM json_each(parents.access_json, '$.links') AS l
             WHERE json_extract(l.value, '$.token') = ?1
           )
           LIMIT 1",
          RawParent::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![token], RawParent::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawParent::into_parent).transpose()
  }

  async fn search(&self, query: &RecordQuery) -> Result<Vec<Record>> {
    let parent_str = query.parent_id.map(encode_uuid);
    let active = query.embargo_active;
    let until_str = query.embargo_until_lte.map(encode_date);
    let status_str = query.deletion_status.map(encode_deletion_status);
    let after_str = query.after.map(encode_uuid);
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val = query.limit.map_or(-1, |l| l as i64);

    let documents: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT document FROM search_index
           WHERE entity_kind = 'record'
             AND (?1 IS NULL OR parent_id = ?1)
             AND (?2 IS NULL OR embargo_active = ?2)
             AND (?3 IS NULL OR (embargo_until IS NOT NULL AND embargo_until <= ?3))
             AND (?4 IS NULL OR deletion_status = ?4)
             AND (?5 IS NULL OR entity_id > ?5)
           ORDER BY entity_id
           LIMIT ?6",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              parent_str,
              active,
              until_str,
              status_str,
              after_str,
              limit_val,
            ],
            |row| row.get(0),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    documents
      .iter()
      .map(|doc| serde_json::from_str(doc).map_err(Error::from))
      .collect()
  }

  async fn commit(&self, uow: UnitOfWork) -> Result<()> {
    if uow.is_empty() {
      return Ok(());
    }

    let writes = uow
      .into_ops()
      .into_iter()
      .map(Write::encode)
      .collect::<Result<Vec<_>>>()?;

    // The inner result carries a revision conflict. Returning before
    // `tx.commit()` drops the transaction, which rolls it back.
    let outcome: std::result::Result<(), String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for write in &writes {
          if let Some(conflict) = write.apply(&tx)? {
            return Ok(Err(conflict));
          }
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    outcome.map_err(|msg| Error::Core(rdm_core::Error::Conflict(msg)))
  }
}
