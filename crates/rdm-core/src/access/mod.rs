//! Access control for records, drafts and parents.
//!
//! Record-level access (protection and embargo) lives on each record and
//! draft. Cross-version access (owner, grants, secret links, request settings)
//! lives on the parent, see [`ParentAccess`](crate::parent::ParentAccess).
//!
//! The visible [`AccessStatus`] is never stored: it is derived from protection
//! and embargo every time it is read.

pub mod grants;
pub mod links;
pub mod mask;
pub mod settings;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Protection ──────────────────────────────────────────────────────────────

/// Visibility of one facet (metadata or files) of a record.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
  #[default]
  Public,
  Restricted,
}

impl Visibility {
  pub fn is_public(self) -> bool { matches!(self, Self::Public) }
}

/// Visibility of the record metadata and of its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Protection {
  pub record: Visibility,
  pub files:  Visibility,
}

// ─── Embargo ─────────────────────────────────────────────────────────────────

/// A time-bounded restriction. Once `until` has passed the embargo is liftable
/// but stays active until something lifts it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Embargo {
  #[serde(default)]
  pub active: bool,
  #[serde(default)]
  pub until:  Option<NaiveDate>,
  #[serde(default)]
  pub reason: Option<String>,
}

impl Embargo {
  /// An active embargo ending on `until`.
  pub fn until(until: NaiveDate, reason: Option<String>) -> Self {
    Self { active: true, until: Some(until), reason }
  }

  /// Active, with an `until` date on or before `today`.
  pub fn is_expired(&self, today: NaiveDate) -> bool {
    self.active && self.until.is_some_and(|until| until <= today)
  }

  /// Deactivate the embargo if its date has been reached. Returns `false` and
  /// leaves `self` unchanged otherwise.
  pub fn lift(&mut self, today: NaiveDate) -> bool {
    match self.until {
      Some(until) if until <= today => {
        self.active = false;
        true
      }
      _ => false,
    }
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// The effective visibility shown to readers.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AccessStatus {
  Open,
  Embargoed,
  Restricted,
  MetadataOnly,
}

/// Derive the status from protection and embargo. Pure; callers recompute it
/// on every read.
pub fn compute_status(protection: &Protection, embargo: &Embargo) -> AccessStatus {
  if embargo.active {
    AccessStatus::Embargoed
  } else if !protection.record.is_public() {
    AccessStatus::Restricted
  } else if !protection.files.is_public() {
    AccessStatus::MetadataOnly
  } else {
    AccessStatus::Open
  }
}

// ─── RecordAccess ────────────────────────────────────────────────────────────

/// Access settings carried by every record and draft.
///
/// Equality is structural; the lifecycle service uses it to decide whether a
/// draft still mirrors its record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordAccess {
  #[serde(default)]
  pub protection: Protection,
  #[serde(default)]
  pub embargo:    Embargo,
}

/// Serialised form of [`RecordAccess`] with the derived status attached.
#[derive(Debug, Clone, Serialize)]
pub struct RecordAccessDump<'a> {
  #[serde(flatten)]
  pub access: &'a RecordAccess,
  pub status: AccessStatus,
}

impl RecordAccess {
  pub fn status(&self) -> AccessStatus {
    compute_status(&self.protection, &self.embargo)
  }

  pub fn dump(&self) -> RecordAccessDump<'_> {
    RecordAccessDump { access: self, status: self.status() }
  }

  /// Structural checks that serde cannot express.
  pub fn validate(&self) -> Result<()> {
    if self.embargo.active && self.embargo.until.is_none() {
      return Err(Error::Validation(
        "an active embargo requires an `until` date".into(),
      ));
    }
    Ok(())
  }

  /// Lift the embargo of record or draft `id` as of `today`.
  ///
  /// Fails with [`Error::EmbargoNotLifted`] when the embargo has no date or
  /// its date is still in the future; `self` is untouched in that case.
  /// Protection is never altered.
  pub fn lift_embargo(&mut self, id: Uuid, today: NaiveDate) -> Result<()> {
    if self.embargo.lift(today) {
      Ok(())
    } else {
      Err(Error::EmbargoNotLifted(id))
    }
  }
}

/// Deserialise client-supplied JSON into `T`, reporting malformed input and
/// unknown enum members as [`Error::Validation`].
pub fn load<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
  serde_json::from_value(value).map_err(|e| Error::Validation(e.to_string()))
}

/// Load and validate record access from client JSON. A client-supplied
/// `status` field is ignored.
pub fn load_access(value: serde_json::Value) -> Result<RecordAccess> {
  let access: RecordAccess = load(value)?;
  access.validate()?;
  Ok(access)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  fn protection(record: Visibility, files: Visibility) -> Protection {
    Protection { record, files }
  }

  #[test]
  fn status_table() {
    use Visibility::{Public, Restricted};

    let off = Embargo::default();
    let on = Embargo::until(date("3220-06-01"), None);

    assert_eq!(
      compute_status(&protection(Public, Public), &off),
      AccessStatus::Open
    );
    assert_eq!(
      compute_status(&protection(Public, Restricted), &off),
      AccessStatus::MetadataOnly
    );
    assert_eq!(
      compute_status(&protection(Restricted, Restricted), &off),
      AccessStatus::Restricted
    );
    assert_eq!(
      compute_status(&protection(Restricted, Public), &off),
      AccessStatus::Restricted
    );
    for p in [Public, Restricted] {
      for f in [Public, Restricted] {
        assert_eq!(
          compute_status(&protection(p, f), &on),
          AccessStatus::Embargoed
        );
      }
    }
  }

  #[test]
  fn status_is_deterministic() {
    let access = RecordAccess {
      protection: protection(Visibility::Public, Visibility::Restricted),
      embargo:    Embargo::default(),
    };
    let first = access.status();
    for _ in 0..10 {
      assert_eq!(access.status(), first);
    }
  }

  #[test]
  fn lift_future_embargo_fails_and_keeps_state() {
    let mut access = RecordAccess {
      protection: protection(Visibility::Public, Visibility::Restricted),
      embargo:    Embargo::until(date("3220-06-01"), Some("pending".into())),
    };
    let before = access.clone();
    let id = Uuid::new_v4();

    let err = access.lift_embargo(id, date("2024-01-01")).unwrap_err();
    assert!(matches!(err, Error::EmbargoNotLifted(e) if e == id));
    assert_eq!(access, before);
  }

  #[test]
  fn lift_on_the_until_date_succeeds() {
    let mut access = RecordAccess {
      protection: Protection::default(),
      embargo:    Embargo::until(date("2024-01-01"), None),
    };
    access
      .lift_embargo(Uuid::new_v4(), date("2024-01-01"))
      .unwrap();
    assert!(!access.embargo.active);
    assert_eq!(access.embargo.until, Some(date("2024-01-01")));
    assert_eq!(access.status(), AccessStatus::Open);
  }

  #[test]
  fn lift_keeps_protection() {
    let mut access = RecordAccess {
      protection: protection(Visibility::Public, Visibility::Restricted),
      embargo:    Embargo::until(date("2000-01-01"), None),
    };
    access.lift_embargo(Uuid::new_v4(), date("2024-01-01")).unwrap();
    assert_eq!(access.protection.files, Visibility::Restricted);
    assert_eq!(access.status(), AccessStatus::MetadataOnly);
  }

  #[test]
  fn lift_without_date_fails() {
    let mut access = RecordAccess::default();
    assert!(
      access
        .lift_embargo(Uuid::new_v4(), date("2024-01-01"))
        .is_err()
    );
  }

  #[test]
  fn load_rejects_active_embargo_without_until() {
    let err = load_access(json!({
      "protection": { "record": "public", "files": "restricted" },
      "embargo": { "active": true }
    }))
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn load_rejects_unknown_visibility() {
    let err = load_access(json!({
      "protection": { "record": "secret", "files": "public" }
    }))
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn load_ignores_client_status() {
    let access = load_access(json!({
      "protection": { "record": "public", "files": "public" },
      "status": "restricted"
    }))
    .unwrap();
    assert_eq!(access.status(), AccessStatus::Open);
  }

  #[test]
  fn dump_includes_derived_status() {
    let access = RecordAccess {
      protection: protection(Visibility::Public, Visibility::Restricted),
      embargo:    Embargo::until(date("3220-06-01"), None),
    };
    let value = serde_json::to_value(access.dump()).unwrap();
    assert_eq!(value["status"], "embargoed");
    assert_eq!(value["protection"]["files"], "restricted");
    assert_eq!(value["embargo"]["until"], "3220-06-01");
  }
}
