//! Permission levels, service actions, and the policy that connects them.
//!
//! The service consults a [`PermissionPolicy`] before every mutating call and
//! before dumping permission-restricted fields. [`GrantPolicy`] is the default
//! evaluator built on ownership, grants and secret-link capabilities.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  access::{RecordAccess, grants::highest_permission},
  identity::Identity,
  parent::Parent,
};

// ─── Permission ──────────────────────────────────────────────────────────────

/// Permission levels, ordered weakest to strongest.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Permission {
  View,
  Preview,
  Edit,
  Manage,
}

// ─── Action ──────────────────────────────────────────────────────────────────

/// An operation the service may be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
  Create,
  Read,
  ReadFiles,
  ReadDraft,
  UpdateDraft,
  Edit,
  NewVersion,
  Publish,
  DiscardDraft,
  LiftEmbargo,
  Manage,
  Delete,
  Restore,
  Purge,
  ScanEmbargos,
}

/// Where a minimum permission level is enough, or where only system
/// processes may act.
enum Requirement {
  Level(Permission),
  SystemOnly,
}

impl Action {
  fn requirement(self) -> Requirement {
    match self {
      Self::Create => Requirement::Level(Permission::View),
      Self::Read | Self::ReadFiles => Requirement::Level(Permission::View),
      Self::ReadDraft => Requirement::Level(Permission::Preview),
      Self::UpdateDraft
      | Self::Edit
      | Self::NewVersion
      | Self::Publish
      | Self::DiscardDraft => Requirement::Level(Permission::Edit),
      Self::LiftEmbargo | Self::Manage => Requirement::Level(Permission::Manage),
      Self::Delete | Self::Restore | Self::Purge | Self::ScanEmbargos => {
        Requirement::SystemOnly
      }
    }
  }
}

// ─── Resource ────────────────────────────────────────────────────────────────

/// What an action is applied to.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
  /// No existing entity, e.g. creating a new lineage.
  Global,
  /// A parent and the access settings of one of its records or drafts.
  Record {
    parent: &'a Parent,
    access: &'a RecordAccess,
  },
  /// Parent-level operations with no specific version involved.
  Parent(&'a Parent),
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Decides whether `identity` may perform `action` on `resource`.
pub trait PermissionPolicy: Send + Sync {
  fn check(&self, identity: &Identity, action: Action, resource: &Resource<'_>) -> Result<()>;

  fn allows(&self, identity: &Identity, action: Action, resource: &Resource<'_>) -> bool {
    self.check(identity, action, resource).is_ok()
  }
}

/// The default policy:
///
/// - system processes may do anything;
/// - creating a lineage needs an authenticated caller;
/// - public, non-embargoed records (and public files) are readable by anyone;
/// - otherwise the caller's level is the maximum of ownership (`manage`),
///   matching grants, and secret-link capabilities for the parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantPolicy;

impl GrantPolicy {
  fn level(identity: &Identity, parent: &Parent) -> Option<Permission> {
    let owner = parent
      .access
      .owned_by
      .as_ref()
      .filter(|o| identity.user_id.as_deref() == Some(o.user.as_str()))
      .map(|_| Permission::Manage);
    let granted = highest_permission(&parent.access.grants, identity);
    let linked = identity.link_grants.get(&parent.id).copied();
    [owner, granted, linked].into_iter().flatten().max()
  }

  fn publicly_readable(action: Action, access: &RecordAccess) -> bool {
    if access.embargo.active {
      return false;
    }
    match action {
      Action::Read => access.protection.record.is_public(),
      Action::ReadFiles => {
        access.protection.record.is_public() && access.protection.files.is_public()
      }
      _ => false,
    }
  }
}

impl PermissionPolicy for GrantPolicy {
  fn check(&self, identity: &Identity, action: Action, resource: &Resource<'_>) -> Result<()> {
    if identity.is_system() {
      return Ok(());
    }

    let required = match action.requirement() {
      Requirement::SystemOnly => return Err(Error::PermissionDenied(action)),
      Requirement::Level(level) => level,
    };

    let allowed = match resource {
      Resource::Global => action == Action::Create && identity.is_authenticated(),
      Resource::Record { parent, access } => {
        Self::publicly_readable(action, access)
          || Self::level(identity, parent).is_some_and(|l| l >= required)
      }
      Resource::Parent(parent) => {
        Self::level(identity, parent).is_some_and(|l| l >= required)
      }
    };

    if allowed {
      Ok(())
    } else {
      Err(Error::PermissionDenied(action))
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{
    access::{
      Embargo, Protection, Visibility,
      grants::{Grant, SubjectType},
    },
    parent::{Owner, Parent},
  };

  fn parent_owned_by(user: &str) -> Parent {
    let mut parent = Parent::new();
    parent.access.owned_by = Some(Owner { user: user.into() });
    parent
  }

  fn restricted() -> RecordAccess {
    RecordAccess {
      protection: Protection {
        record: Visibility::Restricted,
        files:  Visibility::Restricted,
      },
      embargo:    Embargo::default(),
    }
  }

  #[test]
  fn permission_order() {
    assert!(Permission::View < Permission::Preview);
    assert!(Permission::Preview < Permission::Edit);
    assert!(Permission::Edit < Permission::Manage);
  }

  #[test]
  fn owner_can_manage() {
    let parent = parent_owned_by("1");
    let access = restricted();
    let res = Resource::Record { parent: &parent, access: &access };
    let policy = GrantPolicy;

    assert!(policy.allows(&Identity::user("1"), Action::LiftEmbargo, &res));
    assert!(policy.allows(&Identity::user("1"), Action::Read, &res));
    assert!(!policy.allows(&Identity::user("2"), Action::Read, &res));
    assert!(!policy.allows(&Identity::anonymous(), Action::Read, &res));
  }

  #[test]
  fn public_records_are_readable_by_anyone() {
    let parent = parent_owned_by("1");
    let mut access = RecordAccess::default();
    access.protection.files = Visibility::Restricted;
    let res = Resource::Record { parent: &parent, access: &access };
    let policy = GrantPolicy;

    assert!(policy.allows(&Identity::anonymous(), Action::Read, &res));
    assert!(!policy.allows(&Identity::anonymous(), Action::ReadFiles, &res));
    assert!(!policy.allows(&Identity::anonymous(), Action::Edit, &res));
  }

  #[test]
  fn embargo_hides_public_record() {
    let parent = parent_owned_by("1");
    let access = RecordAccess {
      protection: Protection::default(),
      embargo:    Embargo::until(NaiveDate::from_ymd_opt(3220, 6, 1).unwrap(), None),
    };
    let res = Resource::Record { parent: &parent, access: &access };
    assert!(!GrantPolicy.allows(&Identity::anonymous(), Action::Read, &res));
  }

  #[test]
  fn grants_and_links_raise_level() {
    let mut parent = parent_owned_by("1");
    parent
      .access
      .grants
      .push(Grant::new(SubjectType::User, "2", Permission::Edit));
    let access = restricted();
    let res = Resource::Record { parent: &parent, access: &access };
    let policy = GrantPolicy;

    assert!(policy.allows(&Identity::user("2"), Action::Publish, &res));
    assert!(!policy.allows(&Identity::user("2"), Action::Manage, &res));

    let guest = Identity::anonymous().with_link_grant(parent.id, Permission::Preview);
    assert!(policy.allows(&guest, Action::ReadDraft, &res));
    assert!(!policy.allows(&guest, Action::UpdateDraft, &res));
  }

  #[test]
  fn deletion_actions_are_system_only() {
    let parent = parent_owned_by("1");
    let res = Resource::Parent(&parent);
    let policy = GrantPolicy;

    let err = policy
      .check(&Identity::user("1"), Action::Delete, &res)
      .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(Action::Delete)));
    assert!(policy.allows(&Identity::system(), Action::Purge, &res));
  }

  #[test]
  fn create_requires_authentication() {
    let policy = GrantPolicy;
    assert!(policy.allows(&Identity::user("1"), Action::Create, &Resource::Global));
    assert!(!policy.allows(&Identity::anonymous(), Action::Create, &Resource::Global));
    assert!(!policy.allows(&Identity::user("1"), Action::Publish, &Resource::Global));
  }
}
