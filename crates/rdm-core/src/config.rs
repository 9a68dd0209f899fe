//! Service-level configuration.

use serde::Deserialize;

use crate::access::settings::MAX_SECRET_LINK_DAYS;

/// Tunables for the lifecycle service, deserialised from the `[service]`
/// table of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  /// Ceiling for secret-link lifetimes and for `secret_link_expiration`.
  /// Clamped to 365 days.
  pub max_secret_link_days: u32,
  /// Page size used when scanning the index.
  pub scan_page_size:       usize,
}

impl ServiceConfig {
  /// The effective secret-link ceiling.
  pub fn secret_link_ceiling(&self) -> u32 {
    self.max_secret_link_days.min(MAX_SECRET_LINK_DAYS)
  }
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      max_secret_link_days: MAX_SECRET_LINK_DAYS,
      scan_page_size:       100,
    }
  }
}
