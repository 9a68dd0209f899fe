//! Error type for `rdm-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Domain errors raised by the store itself, e.g. revision conflicts.
  #[error("core error: {0}")]
  Core(#[from] rdm_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("column parse error: {0}")]
  Parse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Surface store failures through the service error taxonomy. Domain errors
/// pass through unchanged; everything else is a generic store failure.
impl From<Error> for rdm_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => rdm_core::Error::Store(Box::new(other)),
    }
  }
}
