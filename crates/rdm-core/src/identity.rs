//! The caller identity passed to every service operation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  access::grants::{GrantSubject, SubjectType},
  permission::Permission,
};

/// System role held by scheduled jobs and other internal processes.
pub const SYSTEM_PROCESS: &str = "system_process";
/// System role held by every caller, authenticated or not.
pub const ANY_USER: &str = "any_user";
/// System role held by every authenticated caller.
pub const AUTHENTICATED_USER: &str = "authenticated_user";

/// Who is calling, and which capabilities they present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub user_id:      Option<String>,
  pub roles:        BTreeSet<String>,
  pub system_roles: BTreeSet<String>,
  /// Permissions obtained by presenting secret links, keyed by parent id.
  #[serde(default)]
  pub link_grants:  BTreeMap<Uuid, Permission>,
}

impl Identity {
  pub fn anonymous() -> Self {
    Self {
      system_roles: BTreeSet::from([ANY_USER.to_owned()]),
      ..Self::default()
    }
  }

  pub fn user(user_id: impl Into<String>) -> Self {
    Self {
      user_id: Some(user_id.into()),
      system_roles: BTreeSet::from([
        ANY_USER.to_owned(),
        AUTHENTICATED_USER.to_owned(),
      ]),
      ..Self::default()
    }
  }

  /// The identity used by internal jobs such as the embargo lifter.
  pub fn system() -> Self {
    Self {
      system_roles: BTreeSet::from([
        ANY_USER.to_owned(),
        AUTHENTICATED_USER.to_owned(),
        SYSTEM_PROCESS.to_owned(),
      ]),
      ..Self::default()
    }
  }

  pub fn with_role(mut self, role: impl Into<String>) -> Self {
    self.roles.insert(role.into());
    self
  }

  /// Attach a permission resolved from a secret link. A weaker link never
  /// downgrades a stronger one already held for the same parent.
  pub fn with_link_grant(mut self, parent_id: Uuid, permission: Permission) -> Self {
    let entry = self.link_grants.entry(parent_id).or_insert(permission);
    *entry = (*entry).max(permission);
    self
  }

  pub fn is_system(&self) -> bool { self.system_roles.contains(SYSTEM_PROCESS) }

  pub fn is_authenticated(&self) -> bool {
    self.user_id.is_some() || self.system_roles.contains(AUTHENTICATED_USER)
  }

  /// Whether a grant addressed to `subject` applies to this identity.
  pub fn matches(&self, subject: &GrantSubject) -> bool {
    match subject.kind {
      SubjectType::User => self.user_id.as_deref() == Some(subject.id.as_str()),
      SubjectType::Role => self.roles.contains(&subject.id),
      SubjectType::SystemRole => self.system_roles.contains(&subject.id),
    }
  }
}
