//! Error types for `rdm-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{deletion::DeletionStatus, permission::Action};

/// The kind of entity a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Parent,
  Record,
  Draft,
  VersionState,
  SecretLink,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation error: {0}")]
  Validation(String),

  /// A concurrent writer changed the entity first. Safe to retry.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("embargo on {0} cannot be lifted yet")]
  EmbargoNotLifted(Uuid),

  #[error("permission denied for action {0}")]
  PermissionDenied(Action),

  #[error("secret link has expired")]
  LinkExpired,

  #[error("secret link not found")]
  LinkNotFound,

  #[error("invalid deletion status transition: {from} -> {to}")]
  InvalidStateTransition {
    from: DeletionStatus,
    to:   DeletionStatus,
  },

  #[error("{kind} not found: {id}")]
  NotFound { kind: EntityKind, id: Uuid },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
    Self::NotFound { kind, id }
  }

  /// Whether the caller may reasonably retry the operation as-is.
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Conflict(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
