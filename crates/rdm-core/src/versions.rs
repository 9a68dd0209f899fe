//! Version state of a parent: the version counter, the latest published
//! version, and the open draft.
//!
//! The state is mutated in memory and persisted in the same unit of work as
//! the records and drafts it describes; its `revision` serialises concurrent
//! writers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, record::Draft};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionState {
  pub parent_id:    Uuid,
  /// The number the next new version will receive. Never decreases.
  pub next_index:   u32,
  pub latest_id:    Option<Uuid>,
  pub latest_index: Option<u32>,
  /// The currently open draft, if any. At most one per parent.
  pub draft_id:     Option<Uuid>,
  pub revision:     u32,
}

impl VersionState {
  pub fn new(parent_id: Uuid) -> Self {
    Self {
      parent_id,
      next_index: 1,
      latest_id: None,
      latest_index: None,
      draft_id: None,
      revision: 0,
    }
  }

  pub fn has_draft(&self) -> bool { self.draft_id.is_some() }

  /// Register `draft_id` as the open draft. No version number is allocated,
  /// so discarding the draft later burns nothing.
  pub fn open_draft(&mut self, draft_id: Uuid) -> Result<()> {
    match self.draft_id {
      Some(open) => Err(Error::Conflict(format!(
        "parent {} already has an open draft {open}",
        self.parent_id
      ))),
      None => {
        self.draft_id = Some(draft_id);
        Ok(())
      }
    }
  }

  /// Forget the open draft without publishing it.
  pub fn discard_draft(&mut self, draft_id: Uuid) -> Result<()> {
    self.expect_open(draft_id)?;
    self.draft_id = None;
    Ok(())
  }

  /// Account for publishing `draft` and return its version number.
  ///
  /// Edit drafts keep their existing number. Other drafts take the next
  /// number from the counter. The latest pointer only moves forward.
  pub fn publish(&mut self, draft: &Draft) -> Result<u32> {
    self.expect_open(draft.id)?;

    let index = match draft.version {
      Some(version) => version.index,
      None => {
        let index = self.next_index;
        self.next_index += 1;
        index
      }
    };

    if self.latest_index.is_none_or(|latest| index > latest) {
      self.latest_index = Some(index);
      self.latest_id = Some(draft.id);
    }
    self.draft_id = None;
    Ok(index)
  }

  /// Recompute the latest pointer after a version was purged, from the
  /// `(record_id, index)` pairs that remain.
  pub fn rollback_latest(&mut self, remaining: impl IntoIterator<Item = (Uuid, u32)>) {
    let latest = remaining.into_iter().max_by_key(|(_, index)| *index);
    self.latest_id = latest.map(|(id, _)| id);
    self.latest_index = latest.map(|(_, index)| index);
  }

  pub fn is_latest(&self, record_id: Uuid) -> bool {
    self.latest_id == Some(record_id)
  }

  fn expect_open(&self, draft_id: Uuid) -> Result<()> {
    if self.draft_id == Some(draft_id) {
      Ok(())
    } else {
      Err(Error::Conflict(format!(
        "draft {draft_id} is not the open draft of parent {}",
        self.parent_id
      )))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::{DraftInput, Record};

  fn state_with_draft() -> (VersionState, Draft) {
    let parent_id = Uuid::new_v4();
    let mut state = VersionState::new(parent_id);
    let draft = Draft::new(parent_id, DraftInput::default());
    state.open_draft(draft.id).unwrap();
    (state, draft)
  }

  #[test]
  fn second_open_draft_conflicts() {
    let (mut state, _draft) = state_with_draft();
    let err = state.open_draft(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert!(err.is_retryable());
  }

  #[test]
  fn publish_allocates_and_clears_draft() {
    let (mut state, draft) = state_with_draft();

    assert_eq!(state.publish(&draft).unwrap(), 1);
    assert_eq!(state.next_index, 2);
    assert_eq!(state.latest_id, Some(draft.id));
    assert!(!state.has_draft());

    // A new draft can be opened once the previous one is published.
    state.open_draft(Uuid::new_v4()).unwrap();
  }

  #[test]
  fn discarding_does_not_burn_a_version() {
    let (mut state, draft) = state_with_draft();
    state.discard_draft(draft.id).unwrap();
    assert_eq!(state.next_index, 1);

    let next = Draft::new(state.parent_id, DraftInput::default());
    state.open_draft(next.id).unwrap();
    assert_eq!(state.publish(&next).unwrap(), 1);
  }

  #[test]
  fn edit_draft_keeps_its_version_and_latest() {
    let (mut state, first) = state_with_draft();
    state.publish(&first).unwrap();
    let v1 = Record::from_draft(&first, 1);

    let second = Draft::for_new_version(&v1);
    state.open_draft(second.id).unwrap();
    assert_eq!(state.publish(&second).unwrap(), 2);

    let edit = Draft::for_edit(&v1);
    state.open_draft(edit.id).unwrap();
    assert_eq!(state.publish(&edit).unwrap(), 1);
    assert_eq!(state.latest_id, Some(second.id));
    assert_eq!(state.latest_index, Some(2));
    assert_eq!(state.next_index, 3);
  }

  #[test]
  fn publishing_a_draft_that_is_not_open_conflicts() {
    let (mut state, _draft) = state_with_draft();
    let stray = Draft::new(state.parent_id, DraftInput::default());
    assert!(matches!(state.publish(&stray), Err(Error::Conflict(_))));
  }

  #[test]
  fn rollback_latest_falls_back() {
    let mut state = VersionState::new(Uuid::new_v4());
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    state.latest_id = Some(Uuid::new_v4());
    state.latest_index = Some(3);
    state.next_index = 4;

    state.rollback_latest([(a, 1), (b, 2)]);
    assert_eq!(state.latest_id, Some(b));
    assert_eq!(state.latest_index, Some(2));
    assert_eq!(state.next_index, 4);

    state.rollback_latest([]);
    assert_eq!(state.latest_id, None);
    assert_eq!(state.latest_index, None);
  }
}
