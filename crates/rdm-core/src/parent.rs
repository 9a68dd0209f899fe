//! Parent: the stable identity shared by every version of a record.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{grants::Grant, links::SecretLink, settings::AccessSettings};

/// The user who owns a lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
  pub user: String,
}

/// Access data that applies to every version of a record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParentAccess {
  pub owned_by: Option<Owner>,
  #[serde(default)]
  pub grants:   Vec<Grant>,
  #[serde(default)]
  pub links:    Vec<SecretLink>,
  #[serde(default)]
  pub settings: AccessSettings,
}

/// The cross-version entity. Never versioned itself: only the latest state is
/// kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
  pub id:          Uuid,
  pub communities: BTreeSet<Uuid>,
  pub access:      ParentAccess,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  /// Optimistic-lock counter; 0 means not yet persisted.
  pub revision:    u32,
}

impl Parent {
  pub fn new() -> Self {
    let now = Utc::now();
    Self {
      id:          Uuid::new_v4(),
      communities: BTreeSet::new(),
      access:      ParentAccess::default(),
      created_at:  now,
      updated_at:  now,
      revision:    0,
    }
  }
}

impl Default for Parent {
  fn default() -> Self { Self::new() }
}
