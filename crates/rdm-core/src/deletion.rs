//! Deletion status of a published record.
//!
//! The status is independent of versioning and is stored as a one-letter code
//! on the record row, so bulk queries can filter on it without decoding any
//! metadata.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Where a record sits in the soft-delete lifecycle.
///
/// ```text
/// PUBLISHED ──delete──▶ DELETED ──mark──▶ MARKED_FOR_PURGE
///     ▲                    │
///     └──────restore───────┘
/// ```
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeletionStatus {
  #[default]
  Published,
  Deleted,
  MarkedForPurge,
}

impl DeletionStatus {
  /// The compact storage code.
  pub fn code(self) -> char {
    match self {
      Self::Published => 'P',
      Self::Deleted => 'D',
      Self::MarkedForPurge => 'X',
    }
  }

  pub fn from_code(code: char) -> Option<Self> {
    match code {
      'P' => Some(Self::Published),
      'D' => Some(Self::Deleted),
      'X' => Some(Self::MarkedForPurge),
      _ => None,
    }
  }

  pub fn is_published(self) -> bool { matches!(self, Self::Published) }

  /// Whether `self -> to` is a legal move.
  pub fn can_transition_to(self, to: Self) -> bool {
    matches!(
      (self, to),
      (Self::Published, Self::Deleted)
        | (Self::Deleted, Self::Published)
        | (Self::Deleted, Self::MarkedForPurge)
    )
  }

  /// Move to `to`, or fail with [`Error::InvalidStateTransition`].
  pub fn transition(self, to: Self) -> Result<Self> {
    if self.can_transition_to(to) {
      Ok(to)
    } else {
      Err(Error::InvalidStateTransition { from: self, to })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::DeletionStatus::{self, *};
  use crate::Error;

  #[test]
  fn delete_then_restore() {
    let s = Published.transition(Deleted).unwrap();
    assert_eq!(s, Deleted);
    assert_eq!(s.transition(Published).unwrap(), Published);
  }

  #[test]
  fn purge_requires_deleted_first() {
    let err = Published.transition(MarkedForPurge).unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidStateTransition { from: Published, to: MarkedForPurge }
    ));
    assert_eq!(Deleted.transition(MarkedForPurge).unwrap(), MarkedForPurge);
  }

  #[test]
  fn marked_for_purge_is_terminal() {
    for to in [Published, Deleted, MarkedForPurge] {
      assert!(MarkedForPurge.transition(to).is_err());
    }
  }

  #[test]
  fn self_transitions_are_rejected() {
    assert!(Published.transition(Published).is_err());
    assert!(Deleted.transition(Deleted).is_err());
  }

  #[test]
  fn codes_are_stable() {
    for s in [Published, Deleted, MarkedForPurge] {
      assert_eq!(DeletionStatus::from_code(s.code()), Some(s));
    }
    assert_eq!(DeletionStatus::from_code('Z'), None);
    assert_eq!(Published.to_string(), "PUBLISHED");
  }
}
