//! Secret links: bearer capabilities that grant a fixed permission on a
//! parent, optionally until an expiry time.
//!
//! An expired link is inert rather than removed; resolution rejects it with
//! [`Error::LinkExpired`] so callers can tell "gone" from "never existed".

use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, permission::Permission};

/// Number of random bytes in a link token.
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretLink {
  pub id:          Uuid,
  pub created_at:  DateTime<Utc>,
  /// `None` means the link never expires.
  pub expires_at:  Option<DateTime<Utc>>,
  pub permission:  Permission,
  pub description: Option<String>,
  pub origin:      Option<String>,
  pub token:       String,
}

impl SecretLink {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at.is_some_and(|at| now > at)
  }
}

/// Client input for a new link. `id`, `created_at` and `token` are assigned
/// server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSecretLink {
  #[serde(default)]
  pub expires_at:  Option<DateTime<Utc>>,
  #[serde(default = "default_link_permission")]
  pub permission:  Permission,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub origin:      Option<String>,
}

fn default_link_permission() -> Permission { Permission::View }

impl NewSecretLink {
  pub fn new(permission: Permission) -> Self {
    Self {
      expires_at: None,
      permission,
      description: None,
      origin: None,
    }
  }

  pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
    self.expires_at = Some(expires_at);
    self
  }

  /// Check the link against the expiry rules as of `now`.
  ///
  /// - `parent_limit_days` is the parent's `secret_link_expiration` setting.
  ///   When set, every link must expire within that many days.
  /// - `max_days` is the service-wide ceiling applied to any expiring link.
  pub fn validate(
    &self,
    now: DateTime<Utc>,
    parent_limit_days: Option<u32>,
    max_days: u32,
  ) -> Result<()> {
    if self.permission == Permission::Manage {
      return Err(Error::Validation(
        "secret link permission must be one of view, preview, edit".into(),
      ));
    }

    let Some(expires_at) = self.expires_at else {
      return match parent_limit_days {
        Some(days) => Err(Error::Validation(format!(
          "secret links must expire within {days} days"
        ))),
        None => Ok(()),
      };
    };

    if expires_at <= now {
      return Err(Error::Validation(
        "secret link expiry must be in the future".into(),
      ));
    }

    let limit = parent_limit_days.map_or(max_days, |days| days.min(max_days));
    if expires_at > now + Duration::days(i64::from(limit)) {
      return Err(Error::Validation(format!(
        "secret link expiry exceeds the {limit}-day limit"
      )));
    }
    Ok(())
  }

  /// Materialise the link with a fresh id and token.
  pub fn into_link(self, now: DateTime<Utc>) -> SecretLink {
    SecretLink {
      id:          Uuid::new_v4(),
      created_at:  now,
      expires_at:  self.expires_at,
      permission:  self.permission,
      description: self.description,
      origin:      self.origin,
      token:       generate_token(),
    }
  }
}

/// A hex-encoded token from the OS random source.
pub fn generate_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// Find the link for `token` among `links` and check it is still live.
pub fn resolve_secret_link<'a>(
  links: &'a [SecretLink],
  token: &str,
  now: DateTime<Utc>,
) -> Result<&'a SecretLink> {
  let link = links
    .iter()
    .find(|l| l.token == token)
    .ok_or(Error::LinkNotFound)?;
  if link.is_expired(now) {
    return Err(Error::LinkExpired);
  }
  Ok(link)
}
