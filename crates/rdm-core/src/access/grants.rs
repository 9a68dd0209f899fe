//! Standing permission grants on a parent.

use serde::{Deserialize, Serialize};

use crate::{identity::Identity, permission::Permission};

/// The kind of subject a grant is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
  User,
  Role,
  SystemRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantSubject {
  #[serde(rename = "type")]
  pub kind: SubjectType,
  pub id:   String,
}

/// A permission level assigned to a subject. Grants are not deduplicated;
/// the highest applicable permission wins when they are evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
  pub subject:    GrantSubject,
  pub permission: Permission,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub origin:     Option<String>,
}

impl Grant {
  pub fn new(kind: SubjectType, id: impl Into<String>, permission: Permission) -> Self {
    Self {
      subject: GrantSubject { kind, id: id.into() },
      permission,
      origin: None,
    }
  }
}

/// The strongest permission any of `grants` gives `identity`.
pub fn highest_permission(grants: &[Grant], identity: &Identity) -> Option<Permission> {
  grants
    .iter()
    .filter(|g| identity.matches(&g.subject))
    .map(|g| g.permission)
    .max()
}
