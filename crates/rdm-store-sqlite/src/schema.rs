//! SQL schema for the record SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS parents (
    parent_id    TEXT PRIMARY KEY,
    communities  TEXT NOT NULL DEFAULT '[]',   -- JSON array of UUIDs
    access_json  TEXT NOT NULL,                -- owner, grants, links, settings
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    revision     INTEGER NOT NULL
);

-- One row per parent; every writer bumps `revision`.
CREATE TABLE IF NOT EXISTS versions_state (
    parent_id     TEXT PRIMARY KEY REFERENCES parents(parent_id),
    next_index    INTEGER NOT NULL,
    latest_id     TEXT,
    latest_index  INTEGER,
    draft_id      TEXT,
    revision      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS records (
    record_id        TEXT PRIMARY KEY,
    parent_id        TEXT NOT NULL REFERENCES parents(parent_id),
    version_index    INTEGER NOT NULL,
    metadata_json    TEXT NOT NULL,
    access_json      TEXT NOT NULL,
    files_json       TEXT NOT NULL,
    deletion_status  TEXT NOT NULL DEFAULT 'P'
                     CHECK (deletion_status IN ('P', 'D', 'X')),
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    revision         INTEGER NOT NULL,
    UNIQUE (parent_id, version_index)
);

-- Only open drafts live here; publish and discard delete the row.
CREATE TABLE IF NOT EXISTS drafts (
    draft_id       TEXT PRIMARY KEY,
    parent_id      TEXT NOT NULL REFERENCES parents(parent_id),
    record_id      TEXT,
    version_index  INTEGER,
    metadata_json  TEXT NOT NULL,
    access_json    TEXT NOT NULL,
    files_json     TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    revision       INTEGER NOT NULL
);

-- Search-index mirror, written in the same transaction as the rows above.
CREATE TABLE IF NOT EXISTS search_index (
    entity_kind      TEXT NOT NULL,   -- 'record' | 'draft'
    entity_id        TEXT NOT NULL,
    parent_id        TEXT NOT NULL,
    embargo_active   INTEGER NOT NULL,
    embargo_until    TEXT,            -- YYYY-MM-DD or NULL
    deletion_status  TEXT,            -- records only
    document         TEXT NOT NULL,   -- full JSON of the indexed entity
    indexed_at       TEXT NOT NULL,
    PRIMARY KEY (entity_kind, entity_id)
);

CREATE UNIQUE INDEX IF NOT EXISTS drafts_one_per_parent ON drafts(parent_id);
CREATE INDEX IF NOT EXISTS records_parent_idx   ON records(parent_id);
CREATE INDEX IF NOT EXISTS records_deletion_idx ON records(deletion_status);
CREATE INDEX IF NOT EXISTS search_embargo_idx
    ON search_index(entity_kind, embargo_active, embargo_until);

PRAGMA user_version = 1;
";
