//! Scheduled embargo lifting.
//!
//! The job pairs [`RecordService::scan_expired_embargos`] with
//! [`RecordService::lift_embargo`], one record at a time, as the system
//! identity. A record that cannot be lifted is logged and skipped; the next
//! pass will see it again if it is still due. Deleted records and records
//! marked for purge are skipped without a write.

use std::path::{Path, PathBuf};

use rdm_core::{
  Error, config::ServiceConfig, identity::Identity, permission::PermissionPolicy,
  store::RecordStore,
};
use rdm_service::RecordService;
use serde::Deserialize;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Top-level job configuration deserialised from `config.toml` and `RDM_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
  pub store_path:    PathBuf,
  /// Seconds between passes when not running with `--once`.
  #[serde(default = "default_interval_secs")]
  pub interval_secs: u64,
  #[serde(default)]
  pub service:       ServiceConfig,
}

fn default_interval_secs() -> u64 { 3600 }

impl JobConfig {
  /// `store_path` with a leading `~/` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Job ─────────────────────────────────────────────────────────────────────

/// Outcome of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiftReport {
  pub scanned: usize,
  pub lifted:  usize,
  /// Due records left alone because they are not published.
  pub skipped: usize,
  pub failed:  usize,
}

/// Lift every embargo that is due today. Only a failing scan aborts the
/// pass; per-record failures are counted and logged.
pub async fn lift_expired<S, P>(service: &RecordService<S, P>) -> Result<LiftReport, Error>
where
  S: RecordStore,
  P: PermissionPolicy,
  Error: From<S::Error>,
{
  let identity = Identity::system();
  let mut scan = service.scan_expired_embargos(&identity)?;
  let mut report = LiftReport::default();

  while let Some(record) = scan.next().await? {
    report.scanned += 1;
    if !record.deletion_status.is_published() {
      report.skipped += 1;
      tracing::debug!(
        record_id = %record.id,
        status = %record.deletion_status,
        "skipping embargo lift"
      );
      continue;
    }
    match service.lift_embargo(&identity, record.id).await {
      Ok(_) => report.lifted += 1,
      Err(e) => {
        report.failed += 1;
        tracing::warn!(record_id = %record.id, error = %e, "failed to lift embargo");
      }
    }
  }

  tracing::info!(
    scanned = report.scanned,
    lifted = report.lifted,
    skipped = report.skipped,
    failed = report.failed,
    "embargo pass finished"
  );
  Ok(report)
}

#[cfg(test)]
mod tests;
