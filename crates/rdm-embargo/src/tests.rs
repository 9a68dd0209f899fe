//! Tests for the embargo job against an in-memory store.

use std::{path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use rdm_core::{
  access::{Embargo, Protection, RecordAccess, Visibility},
  config::ServiceConfig,
  identity::Identity,
  record::DraftInput,
  store::RecordStore,
};
use rdm_service::RecordService;
use rdm_store_sqlite::SqliteStore;
use serde_json::json;

use crate::{JobConfig, LiftReport, expand_tilde, lift_expired};

fn embargoed(y: i32) -> DraftInput {
  DraftInput {
    metadata: json!({ "title": "Survey" }),
    access: RecordAccess {
      protection: Protection {
        record: Visibility::Public,
        files:  Visibility::Restricted,
      },
      embargo:    Embargo::until(NaiveDate::from_ymd_opt(y, 1, 1).unwrap(), None),
    },
    files_enabled: false,
  }
}

#[tokio::test]
async fn lifts_only_due_records() {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  let service = RecordService::new(Arc::new(store), ServiceConfig {
    scan_page_size: 2,
    ..ServiceConfig::default()
  });
  let owner = Identity::user("owner");

  let mut due = Vec::new();
  for year in [2001, 2002, 2003] {
    let draft = service.create(&owner, embargoed(year)).await.unwrap();
    due.push(service.publish(&owner, draft.id).await.unwrap().id);
  }
  let draft = service.create(&owner, embargoed(3220)).await.unwrap();
  let future = service.publish(&owner, draft.id).await.unwrap().id;

  let report = lift_expired(&service).await.unwrap();
  assert_eq!(report, LiftReport { scanned: 3, lifted: 3, skipped: 0, failed: 0 });

  for id in due {
    let item = service.read(&Identity::anonymous(), id).await.unwrap();
    assert!(!item.record.access.embargo.active);
  }
  let item = service.read(&owner, future).await.unwrap();
  assert!(item.record.access.embargo.active);

  // Nothing left on the second pass.
  let report = lift_expired(&service).await.unwrap();
  assert_eq!(report, LiftReport::default());
}

#[tokio::test]
async fn skips_deleted_records() {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  let service = RecordService::new(Arc::new(store), ServiceConfig::default());
  let owner = Identity::user("owner");
  let system = Identity::system();

  let draft = service.create(&owner, embargoed(2001)).await.unwrap();
  let deleted = service.publish(&owner, draft.id).await.unwrap();
  service.delete_record(&system, deleted.id).await.unwrap();
  let draft = service.create(&owner, embargoed(2002)).await.unwrap();
  let purging = service.publish(&owner, draft.id).await.unwrap();
  service.delete_record(&system, purging.id).await.unwrap();
  service.mark_for_purge(&system, purging.id).await.unwrap();
  let before = service.store().get_record(purging.id).await.unwrap().unwrap();

  let report = lift_expired(&service).await.unwrap();
  assert_eq!(report, LiftReport { scanned: 2, lifted: 0, skipped: 2, failed: 0 });

  let after = service.store().get_record(purging.id).await.unwrap().unwrap();
  assert_eq!(after.revision, before.revision);
  assert!(after.access.embargo.active);

  // A restored record is lifted on the next pass.
  service.restore_record(&system, deleted.id).await.unwrap();
  let report = lift_expired(&service).await.unwrap();
  assert_eq!(report, LiftReport { scanned: 2, lifted: 1, skipped: 1, failed: 0 });
}

#[test]
fn config_defaults() {
  let settings = config::Config::builder()
    .add_source(config::File::from_str(
      r#"store_path = "/var/lib/rdm/records.db""#,
      config::FileFormat::Toml,
    ))
    .build()
    .unwrap();
  let cfg: JobConfig = settings.try_deserialize().unwrap();

  assert_eq!(cfg.store_path, PathBuf::from("/var/lib/rdm/records.db"));
  assert_eq!(cfg.interval_secs, 3600);
  assert_eq!(cfg.service, ServiceConfig::default());
}

#[test]
fn config_service_table() {
  let settings = config::Config::builder()
    .add_source(config::File::from_str(
      r#"
        store_path    = "records.db"
        interval_secs = 60

        [service]
        max_secret_link_days = 90
      "#,
      config::FileFormat::Toml,
    ))
    .build()
    .unwrap();
  let cfg: JobConfig = settings.try_deserialize().unwrap();

  assert_eq!(cfg.interval_secs, 60);
  assert_eq!(cfg.service.max_secret_link_days, 90);
  assert_eq!(cfg.service.scan_page_size, 100);
}

#[test]
fn tilde_expansion() {
  let plain = PathBuf::from("/tmp/records.db");
  assert_eq!(expand_tilde(&plain), plain);

  if let Ok(home) = std::env::var("HOME") {
    let expanded = expand_tilde(&PathBuf::from("~/records.db"));
    assert_eq!(expanded, PathBuf::from(home).join("records.db"));
  }
}
