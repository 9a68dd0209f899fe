//! The expired-embargo scan.
//!
//! The scan reads the search-index mirror page by page, keyed on record id,
//! so it never holds more than one page in memory and can resume from the
//! last id it returned. It never writes; pairing it with
//! [`RecordService::lift_embargo`] is up to the caller.

use std::collections::VecDeque;

use rdm_core::{
  Error, Result,
  identity::Identity,
  permission::{Action, PermissionPolicy, Resource},
  record::Record,
  store::{RecordQuery, RecordStore},
};
use uuid::Uuid;

use crate::{RecordService, today};

/// A lazy sequence of records whose embargo is active and due.
///
/// Results reflect the index at the time each page is fetched; records
/// lifted or changed mid-scan may or may not appear.
pub struct ExpiredEmbargoScan<'a, S> {
  store: &'a S,
  query: RecordQuery,
  page:  VecDeque<Record>,
  done:  bool,
}

impl<'a, S> ExpiredEmbargoScan<'a, S>
where
  S: RecordStore,
  Error: From<S::Error>,
{
  fn new(store: &'a S, query: RecordQuery) -> Self {
    Self { store, query, page: VecDeque::new(), done: false }
  }

  /// Continue after `record_id`, e.g. to restart an interrupted scan.
  pub fn resume_after(mut self, record_id: Uuid) -> Self {
    self.query.after = Some(record_id);
    self
  }

  /// The id of the last record fetched from the index.
  pub fn cursor(&self) -> Option<Uuid> { self.query.after }

  /// The next due record, fetching another page when the current one is
  /// exhausted.
  pub async fn next(&mut self) -> Result<Option<Record>> {
    if self.page.is_empty() && !self.done {
      self.fetch_page().await?;
    }
    Ok(self.page.pop_front())
  }

  /// Drain the scan into a vector.
  pub async fn collect(mut self) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    while let Some(record) = self.next().await? {
      records.push(record);
    }
    Ok(records)
  }

  async fn fetch_page(&mut self) -> Result<()> {
    let records = self.store.search(&self.query).await?;
    let full = self.query.limit.is_some_and(|limit| records.len() >= limit);

    if let Some(last) = records.last() {
      self.query.after = Some(last.id);
    }
    self.done = !full;
    tracing::debug!(fetched = records.len(), cursor = ?self.query.after, "fetched scan page");

    self.page.extend(records);
    Ok(())
  }
}

impl<S, P> RecordService<S, P>
where
  S: RecordStore,
  P: PermissionPolicy,
  Error: From<S::Error>,
{
  /// Every record with an active embargo whose `until` is on or before today
  /// (UTC), ordered by record id.
  pub fn scan_expired_embargos(&self, identity: &Identity) -> Result<ExpiredEmbargoScan<'_, S>> {
    self.policy.check(identity, Action::ScanEmbargos, &Resource::Global)?;

    let query = RecordQuery {
      limit: Some(self.config.scan_page_size.max(1)),
      ..RecordQuery::expired_embargos(today())
    };
    Ok(ExpiredEmbargoScan::new(self.store.as_ref(), query))
  }
}
