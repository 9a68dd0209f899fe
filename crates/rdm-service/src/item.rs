//! Caller-facing views of records and drafts.
//!
//! An item pairs the entity with its parent and knows how to dump itself as
//! JSON: record access gains the derived `status`, and parent access is
//! masked according to what the caller may manage.

use rdm_core::{
  Result,
  access::{
    RecordAccess,
    mask::{PARENT_ACCESS_DUMP_PERMISSIONS, mask_fields},
  },
  parent::Parent,
  permission::Action,
  record::{Draft, Record},
};
use serde::Serialize;
use serde_json::{Value, json};

/// A published record as seen by one caller.
#[derive(Debug, Clone)]
pub struct RecordItem {
  pub record:     Record,
  pub parent:     Parent,
  /// Whether the caller holds `manage` on the parent.
  pub can_manage: bool,
}

/// An open draft as seen by one caller.
#[derive(Debug, Clone)]
pub struct DraftItem {
  pub draft:      Draft,
  pub parent:     Parent,
  pub can_manage: bool,
}

impl RecordItem {
  pub fn to_json(&self) -> Result<Value> {
    dump(&self.record, &self.record.access, &self.parent, self.can_manage)
  }
}

impl DraftItem {
  pub fn to_json(&self) -> Result<Value> {
    dump(&self.draft, &self.draft.access, &self.parent, self.can_manage)
  }
}

fn dump(
  entity: &impl Serialize,
  access: &RecordAccess,
  parent: &Parent,
  can_manage: bool,
) -> Result<Value> {
  let mut parent_access = serde_json::to_value(&parent.access)?;
  mask_fields(&mut parent_access, PARENT_ACCESS_DUMP_PERMISSIONS, |action| {
    action != Action::Manage || can_manage
  });

  let mut value = serde_json::to_value(entity)?;
  if let Some(object) = value.as_object_mut() {
    object.insert("access".into(), serde_json::to_value(access.dump())?);
    object.insert(
      "parent".into(),
      json!({
        "id": parent.id,
        "communities": parent.communities,
        "access": parent_access,
      }),
    );
  }
  Ok(value)
}

#[cfg(test)]
mod tests {
  use rdm_core::{
    access::{
      Protection, Visibility,
      grants::{Grant, SubjectType},
    },
    parent::Owner,
    permission::Permission,
    record::DraftInput,
  };

  use super::*;

  fn item(can_manage: bool) -> RecordItem {
    let mut parent = Parent::new();
    parent.access.owned_by = Some(Owner { user: "1".into() });
    parent
      .access
      .grants
      .push(Grant::new(SubjectType::User, "2", Permission::View));
    let draft = Draft::new(parent.id, DraftInput {
      access: RecordAccess {
        protection: Protection {
          record: Visibility::Public,
          files:  Visibility::Restricted,
        },
        ..RecordAccess::default()
      },
      ..DraftInput::default()
    });
    RecordItem {
      record: Record::from_draft(&draft, 1),
      parent,
      can_manage,
    }
  }

  #[test]
  fn dump_carries_derived_status() {
    let value = item(false).to_json().unwrap();
    assert_eq!(value["access"]["status"], "metadata-only");
    assert_eq!(value["access"]["protection"]["files"], "restricted");
    assert_eq!(value["version"]["index"], 1);
  }

  #[test]
  fn parent_access_masked_without_manage() {
    let value = item(false).to_json().unwrap();
    let access = value["parent"]["access"].as_object().unwrap();
    assert!(access.contains_key("settings"));
    assert!(!access.contains_key("grants"));
    assert!(!access.contains_key("owned_by"));
    assert!(!access.contains_key("links"));
  }

  #[test]
  fn parent_access_visible_to_managers() {
    let value = item(true).to_json().unwrap();
    assert_eq!(value["parent"]["access"]["owned_by"]["user"], "1");
    assert_eq!(value["parent"]["access"]["grants"][0]["subject"]["id"], "2");
  }
}
