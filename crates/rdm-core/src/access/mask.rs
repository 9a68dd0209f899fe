//! Permission-driven field masking for serialised access data.
//!
//! Masking runs after serialisation, over a plain JSON object, so the data
//! types stay free of caller-dependent behaviour.

use serde_json::Value;

use crate::permission::Action;

/// Parent access fields hidden from callers who cannot manage the record.
/// `settings` is always visible.
pub const PARENT_ACCESS_DUMP_PERMISSIONS: &[(&str, Action)] = &[
  ("grants", Action::Manage),
  ("owned_by", Action::Manage),
  ("links", Action::Manage),
];

/// Remove every field in `rules` whose action `allowed` rejects. Non-object
/// values are left alone.
pub fn mask_fields(
  dump: &mut Value,
  rules: &[(&str, Action)],
  allowed: impl Fn(Action) -> bool,
) {
  let Some(object) = dump.as_object_mut() else {
    return;
  };
  for (field, action) in rules {
    if object.contains_key(*field) && !allowed(*action) {
      object.remove(*field);
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn dump() -> Value {
    json!({
      "owned_by": { "user": "1" },
      "grants": [],
      "links": [{ "token": "abc" }],
      "settings": { "allow_user_requests": false }
    })
  }

  #[test]
  fn hides_managed_fields_without_permission() {
    let mut value = dump();
    mask_fields(&mut value, PARENT_ACCESS_DUMP_PERMISSIONS, |_| false);
    assert_eq!(value, json!({ "settings": { "allow_user_requests": false } }));
  }

  #[test]
  fn keeps_everything_with_permission() {
    let mut value = dump();
    mask_fields(&mut value, PARENT_ACCESS_DUMP_PERMISSIONS, |a| {
      a == Action::Manage
    });
    assert_eq!(value, dump());
  }

  #[test]
  fn ignores_non_objects() {
    let mut value = json!([1, 2]);
    mask_fields(&mut value, PARENT_ACCESS_DUMP_PERMISSIONS, |_| false);
    assert_eq!(value, json!([1, 2]));
  }
}
