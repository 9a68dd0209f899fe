//! Parent-level access settings and their input translation.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, access::load};

/// Hard ceiling for `secret_link_expiration`, in days.
pub const MAX_SECRET_LINK_DAYS: u32 = 365;

/// Settings shared by every version of a record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessSettings {
  /// Whether authenticated users may request access.
  #[serde(default)]
  pub allow_user_requests:    bool,
  /// Whether guests may request access.
  #[serde(default)]
  pub allow_guest_requests:   bool,
  #[serde(default)]
  pub accept_conditions_text: Option<String>,
  /// Maximum lifetime of new secret links in days; `None` means no limit.
  #[serde(default)]
  pub secret_link_expiration: Option<u32>,
}

impl AccessSettings {
  pub fn validate(&self, max_days: u32) -> Result<()> {
    match self.secret_link_expiration {
      Some(0) => Err(Error::Validation(
        "secret_link_expiration must be positive or absent".into(),
      )),
      Some(days) if days > max_days => Err(Error::Validation(format!(
        "secret_link_expiration must be at most {max_days} days"
      ))),
      _ => Ok(()),
    }
  }
}

/// Settings as submitted by a client. The expiration comes from a dropdown
/// where `0` stands for "no limit".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessSettingsInput {
  #[serde(default)]
  pub allow_user_requests:    bool,
  #[serde(default)]
  pub allow_guest_requests:   bool,
  #[serde(default)]
  pub accept_conditions_text: Option<String>,
  #[serde(default)]
  pub secret_link_expiration: Option<i64>,
}

impl AccessSettingsInput {
  /// Normalise the dropdown value and validate against `max_days`.
  pub fn translate(self, max_days: u32) -> Result<AccessSettings> {
    let secret_link_expiration = match self.secret_link_expiration {
      None | Some(0) => None,
      Some(days) => Some(u32::try_from(days).map_err(|_| {
        Error::Validation(format!("invalid secret_link_expiration: {days}"))
      })?),
    };

    let settings = AccessSettings {
      allow_user_requests: self.allow_user_requests,
      allow_guest_requests: self.allow_guest_requests,
      accept_conditions_text: self.accept_conditions_text,
      secret_link_expiration,
    };
    settings.validate(max_days)?;
    Ok(settings)
  }
}

/// Load settings from client JSON, translating and validating them.
pub fn load_settings(value: serde_json::Value, max_days: u32) -> Result<AccessSettings> {
  load::<AccessSettingsInput>(value)?.translate(max_days)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn expiration(days: i64) -> Result<Option<u32>> {
    load_settings(json!({ "secret_link_expiration": days }), MAX_SECRET_LINK_DAYS)
      .map(|s| s.secret_link_expiration)
  }

  #[test]
  fn zero_means_no_limit() {
    assert_eq!(expiration(0).unwrap(), None);
  }

  #[test]
  fn positive_values_are_kept() {
    assert_eq!(expiration(1).unwrap(), Some(1));
    assert_eq!(expiration(30).unwrap(), Some(30));
    assert_eq!(expiration(365).unwrap(), Some(365));
  }

  #[test]
  fn values_above_ceiling_fail() {
    assert!(matches!(expiration(366), Err(Error::Validation(_))));
    assert!(matches!(expiration(10_000), Err(Error::Validation(_))));
  }

  #[test]
  fn negative_values_fail() {
    assert!(matches!(expiration(-1), Err(Error::Validation(_))));
  }

  #[test]
  fn missing_or_null_expiration_means_no_limit() {
    let s = load_settings(json!({ "allow_user_requests": true }), 365).unwrap();
    assert!(s.allow_user_requests);
    assert_eq!(s.secret_link_expiration, None);

    let s = load_settings(json!({ "secret_link_expiration": null }), 365).unwrap();
    assert_eq!(s.secret_link_expiration, None);
  }

  #[test]
  fn configured_ceiling_can_be_lower() {
    assert!(load_settings(json!({ "secret_link_expiration": 60 }), 30).is_err());
  }
}
