//! Access changes: embargo lifting, parent settings, grants, secret links and
//! communities.

use chrono::Utc;
use rdm_core::{
  EntityKind, Error, Result,
  access::{
    grants::Grant,
    links::{NewSecretLink, SecretLink, resolve_secret_link},
    settings::AccessSettingsInput,
  },
  identity::Identity,
  parent::Parent,
  permission::{Action, Permission, PermissionPolicy, Resource},
  record::Record,
  store::{RecordStore, UnitOfWork},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{RecordService, today};

/// What a secret-link token grants, and on which parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
  pub parent_id:  Uuid,
  pub link_id:    Uuid,
  pub permission: Permission,
}

impl ResolvedLink {
  /// `identity` extended with this link's capability.
  pub fn grant(&self, identity: Identity) -> Identity {
    identity.with_link_grant(self.parent_id, self.permission)
  }
}

impl<S, P> RecordService<S, P>
where
  S: RecordStore,
  P: PermissionPolicy,
  Error: From<S::Error>,
{
  // ─── Embargo ──────────────────────────────────────────────────────────────

  /// Lift the embargo of a published record whose `until` date has passed.
  ///
  /// An open draft of the parent is lifted too, but only if its access is
  /// identical to the record's. A draft whose access has diverged is left for
  /// its editor. If either lift fails nothing is written.
  pub async fn lift_embargo(&self, identity: &Identity, record_id: Uuid) -> Result<Record> {
    let mut record = self.load_record(record_id).await?;
    let parent = self.load_parent(record.parent_id).await?;

    let resource = Resource::Record { parent: &parent, access: &record.access };
    self.policy.check(identity, Action::LiftEmbargo, &resource)?;

    let today = today();
    let draft = match self.store.get_version_state(parent.id).await? {
      Some(state) => match state.draft_id {
        Some(draft_id) => self.store.get_draft(draft_id).await?,
        None => None,
      },
      None => None,
    };
    let mut draft = draft.filter(|d| d.access == record.access);

    if let Some(draft) = draft.as_mut() {
      draft.access.lift_embargo(draft.id, today)?;
    }
    record.access.lift_embargo(record.id, today)?;

    let mut uow = UnitOfWork::new();
    uow.put_record(&mut record);
    if let Some(draft) = draft.as_mut() {
      uow.put_draft(draft);
    }
    self.commit(uow).await?;

    tracing::info!(
      record_id = %record.id,
      parent_id = %parent.id,
      draft_synced = draft.is_some(),
      "lifted embargo"
    );
    Ok(record)
  }

  // ─── Parent settings ──────────────────────────────────────────────────────

  pub async fn update_access_settings(
    &self,
    identity: &Identity,
    parent_id: Uuid,
    input: AccessSettingsInput,
  ) -> Result<Parent> {
    let mut parent = self.load_parent(parent_id).await?;
    self.policy.check(identity, Action::Manage, &Resource::Parent(&parent))?;

    parent.access.settings = input.translate(self.config.secret_link_ceiling())?;
    self.save_parent(&mut parent).await?;

    tracing::info!(
      parent_id = %parent.id,
      secret_link_expiration = ?parent.access.settings.secret_link_expiration,
      "updated access settings"
    );
    Ok(parent)
  }

  // ─── Grants ───────────────────────────────────────────────────────────────

  pub async fn add_grant(&self, identity: &Identity, parent_id: Uuid, grant: Grant) -> Result<Parent> {
    let mut parent = self.load_parent(parent_id).await?;
    self.policy.check(identity, Action::Manage, &Resource::Parent(&parent))?;

    tracing::info!(
      parent_id = %parent.id,
      subject = %grant.subject.id,
      permission = %grant.permission,
      "added grant"
    );
    parent.access.grants.push(grant);
    self.save_parent(&mut parent).await?;
    Ok(parent)
  }

  /// Remove every grant equal to `grant`.
  pub async fn remove_grant(
    &self,
    identity: &Identity,
    parent_id: Uuid,
    grant: &Grant,
  ) -> Result<Parent> {
    let mut parent = self.load_parent(parent_id).await?;
    self.policy.check(identity, Action::Manage, &Resource::Parent(&parent))?;

    let before = parent.access.grants.len();
    parent.access.grants.retain(|g| g != grant);
    if parent.access.grants.len() == before {
      return Err(Error::Validation(format!(
        "parent {parent_id} has no such grant for {}",
        grant.subject.id
      )));
    }
    self.save_parent(&mut parent).await?;

    tracing::info!(parent_id = %parent.id, subject = %grant.subject.id, "removed grant");
    Ok(parent)
  }

  // ─── Secret links ─────────────────────────────────────────────────────────

  /// Create a secret link on the parent. Its lifetime is bounded by the
  /// parent's `secret_link_expiration` when set, and by the service-wide
  /// ceiling otherwise.
  pub async fn create_secret_link(
    &self,
    identity: &Identity,
    parent_id: Uuid,
    new: NewSecretLink,
  ) -> Result<SecretLink> {
    let mut parent = self.load_parent(parent_id).await?;
    self.policy.check(identity, Action::Manage, &Resource::Parent(&parent))?;

    let now = Utc::now();
    new.validate(
      now,
      parent.access.settings.secret_link_expiration,
      self.config.secret_link_ceiling(),
    )?;
    let link = new.into_link(now);
    parent.access.links.push(link.clone());
    self.save_parent(&mut parent).await?;

    tracing::info!(
      parent_id = %parent.id,
      link_id = %link.id,
      permission = %link.permission,
      expires_at = ?link.expires_at,
      "created secret link"
    );
    Ok(link)
  }

  pub async fn delete_secret_link(
    &self,
    identity: &Identity,
    parent_id: Uuid,
    link_id: Uuid,
  ) -> Result<()> {
    let mut parent = self.load_parent(parent_id).await?;
    self.policy.check(identity, Action::Manage, &Resource::Parent(&parent))?;

    let before = parent.access.links.len();
    parent.access.links.retain(|l| l.id != link_id);
    if parent.access.links.len() == before {
      return Err(Error::not_found(EntityKind::SecretLink, link_id));
    }
    self.save_parent(&mut parent).await?;

    tracing::info!(parent_id = %parent.id, link_id = %link_id, "deleted secret link");
    Ok(())
  }

  /// Resolve a token presented by a caller. Unknown tokens fail with
  /// [`Error::LinkNotFound`], expired ones with [`Error::LinkExpired`].
  ///
  /// Presenting a token needs no permission of its own; `identity` is the
  /// caller the link will later be granted to.
  pub async fn resolve_secret_link(&self, identity: &Identity, token: &str) -> Result<ResolvedLink> {
    let parent = self
      .store
      .find_parent_by_link(token)
      .await?
      .ok_or(Error::LinkNotFound)?;
    let link = resolve_secret_link(&parent.access.links, token, Utc::now())?;

    tracing::debug!(
      parent_id = %parent.id,
      link_id = %link.id,
      user = ?identity.user_id,
      "resolved secret link"
    );
    Ok(ResolvedLink {
      parent_id:  parent.id,
      link_id:    link.id,
      permission: link.permission,
    })
  }

  // ─── Communities ──────────────────────────────────────────────────────────

  pub async fn add_community(
    &self,
    identity: &Identity,
    parent_id: Uuid,
    community_id: Uuid,
  ) -> Result<Parent> {
    let mut parent = self.load_parent(parent_id).await?;
    self.policy.check(identity, Action::Manage, &Resource::Parent(&parent))?;

    if parent.communities.insert(community_id) {
      self.save_parent(&mut parent).await?;
      tracing::info!(parent_id = %parent.id, community_id = %community_id, "added community");
    }
    Ok(parent)
  }

  pub async fn remove_community(
    &self,
    identity: &Identity,
    parent_id: Uuid,
    community_id: Uuid,
  ) -> Result<Parent> {
    let mut parent = self.load_parent(parent_id).await?;
    self.policy.check(identity, Action::Manage, &Resource::Parent(&parent))?;

    if parent.communities.remove(&community_id) {
      self.save_parent(&mut parent).await?;
      tracing::info!(parent_id = %parent.id, community_id = %community_id, "removed community");
    }
    Ok(parent)
  }

  async fn save_parent(&self, parent: &mut Parent) -> Result<()> {
    let mut uow = UnitOfWork::new();
    uow.put_parent(parent);
    self.commit(uow).await
  }
}
