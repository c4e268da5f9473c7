//! Server tagging: turning CLI flags into ordered metadata writes
//!
//! The flags are not independent toggles. They expand into a fixed sequence
//! of [`MetadataChange`]s and each change sees the metadata left behind by
//! the one before, so `--sudo --no-sudo` ends with `ansible_sudo` removed.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use crate::{
    metadata::{check_host_var, check_role, encode_roles, HostVars, HOST_VARS_KEY, ROLES_KEY},
    ComputeService, Result, Server,
};

/// Host variable toggled by `--sudo` / `--no-sudo`
pub const SUDO_VAR: &str = "ansible_sudo";
/// Host variable set by `--user` / `--no-user`
pub const SSH_USER_VAR: &str = "ansible_ssh_user";

/// Tagging flags as given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOptions {
    /// Roles to set, replacing the current list
    pub roles: Vec<String>,
    /// Delete the role list
    pub no_roles: bool,
    /// Turn on sudo
    pub sudo: bool,
    /// Turn off sudo
    pub no_sudo: bool,
    /// Connection user
    pub user: Option<String>,
    /// Remove the connection user
    pub no_user: bool,
}

/// One metadata write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataChange {
    SetRoles(Vec<String>),
    ClearRoles,
    SetHostVar { key: String, value: String },
    RemoveHostVar { key: String },
}

impl TagOptions {
    /// The requested changes, in the order they must be applied
    #[must_use]
    pub fn changes(&self) -> Vec<MetadataChange> {
        let steps = [
            (!self.roles.is_empty()).then(|| MetadataChange::SetRoles(self.roles.clone())),
            self.no_roles.then_some(MetadataChange::ClearRoles),
            self.sudo.then(|| MetadataChange::SetHostVar {
                key: SUDO_VAR.to_string(),
                value: "yes".to_string(),
            }),
            self.no_sudo.then(|| MetadataChange::RemoveHostVar {
                key: SUDO_VAR.to_string(),
            }),
            self.user.as_ref().map(|user| MetadataChange::SetHostVar {
                key: SSH_USER_VAR.to_string(),
                value: user.clone(),
            }),
            self.no_user.then(|| MetadataChange::RemoveHostVar {
                key: SSH_USER_VAR.to_string(),
            }),
        ];

        steps.into_iter().flatten().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes().is_empty()
    }

    /// Refuse role names and values the metadata fields cannot hold
    ///
    /// # Errors
    ///
    /// `InvalidRole` for a role with a `,` or an empty name,
    /// `InvalidHostVarValue` for a user containing `;`.
    pub fn validate(&self) -> Result<()> {
        self.roles.iter().try_for_each(|role| check_role(role))?;
        match &self.user {
            Some(user) => check_host_var(SSH_USER_VAR, user),
            None => Ok(()),
        }
    }
}

/// Resolve each identifier and apply the options to it, in order
///
/// The options are checked before any server is looked up. Stops at the
/// first server that cannot be resolved; servers handled before it keep
/// their changes.
///
/// # Errors
///
/// `InvalidRole` / `InvalidHostVarValue` from validation,
/// `ServerNotFound` / `AmbiguousServer` from resolution, and any service or
/// codec failure from applying the changes.
pub async fn tag_servers(
    service: &dyn ComputeService,
    idents: &[String],
    options: &TagOptions,
) -> Result<()> {
    options.validate()?;
    let changes = options.changes();
    for ident in idents {
        let mut server = service.find_server(ident).await?;
        tracing::debug!(ident = %ident, server = %server.id, "resolved server");
        apply_changes(service, &mut server, &changes).await?;
    }
    Ok(())
}

/// Apply changes one after another, keeping `server.metadata` in step
/// with what was written
///
/// # Errors
///
/// Service failures, or `MalformedHostVar` when the existing
/// `ansible_host_vars` field cannot be decoded.
pub async fn apply_changes(
    service: &dyn ComputeService,
    server: &mut Server,
    changes: &[MetadataChange],
) -> Result<()> {
    for change in changes {
        match change {
            MetadataChange::SetRoles(roles) => {
                let value = encode_roles(roles)?;
                set_field(service, server, ROLES_KEY, value).await?;
            }
            MetadataChange::ClearRoles => {
                if service.delete_metadata_item(&server.id, ROLES_KEY).await? {
                    tracing::info!(server = %server.id, "deleted roles");
                } else {
                    tracing::debug!(server = %server.id, "no roles to delete");
                }
                server.metadata.remove(ROLES_KEY);
            }
            MetadataChange::SetHostVar { key, value } => {
                set_host_var(service, server, key, value).await?;
            }
            MetadataChange::RemoveHostVar { key } => {
                remove_host_var(service, server, key).await?;
            }
        }
    }
    Ok(())
}

/// Upsert one host variable and write the packed field back
///
/// # Errors
///
/// Service failures, or `MalformedHostVar` for an undecodable field.
pub async fn set_host_var(
    service: &dyn ComputeService,
    server: &mut Server,
    key: &str,
    value: &str,
) -> Result<()> {
    let mut host_vars = HostVars::decode(server.metadata_value(HOST_VARS_KEY))?;
    host_vars.upsert(key, value)?;
    set_field(service, server, HOST_VARS_KEY, host_vars.encode()).await
}

/// Remove one host variable
///
/// Does nothing when the server has no `ansible_host_vars` field. Removing
/// the last variable deletes the field rather than leaving it empty.
///
/// # Errors
///
/// Service failures, or `MalformedHostVar` for an undecodable field.
pub async fn remove_host_var(
    service: &dyn ComputeService,
    server: &mut Server,
    key: &str,
) -> Result<()> {
    let Some(raw) = server.metadata_value(HOST_VARS_KEY) else {
        return Ok(());
    };

    let mut host_vars = HostVars::decode(Some(raw))?;
    host_vars.remove(key);

    if host_vars.is_empty() {
        service.delete_metadata_item(&server.id, HOST_VARS_KEY).await?;
        server.metadata.remove(HOST_VARS_KEY);
        tracing::info!(server = %server.id, "deleted {HOST_VARS_KEY}");
        Ok(())
    } else {
        set_field(service, server, HOST_VARS_KEY, host_vars.encode()).await
    }
}

async fn set_field(
    service: &dyn ComputeService,
    server: &mut Server,
    key: &str,
    value: String,
) -> Result<()> {
    service.set_metadata_item(&server.id, key, &value).await?;
    tracing::info!(server = %server.id, key, value = %value, "set metadata");
    server.metadata.insert(key.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_support::InMemoryCompute, Error};

    fn options() -> TagOptions {
        TagOptions::default()
    }

    #[test]
    fn test_no_flags_no_changes() {
        assert!(options().is_empty());
    }

    #[test]
    fn test_change_order_is_fixed() {
        let opts = TagOptions {
            roles: vec!["web".into()],
            no_roles: true,
            sudo: true,
            no_sudo: true,
            user: Some("centos".into()),
            no_user: true,
        };
        let changes = opts.changes();
        assert_eq!(changes.len(), 6);
        assert_eq!(changes[0], MetadataChange::SetRoles(vec!["web".into()]));
        assert_eq!(changes[1], MetadataChange::ClearRoles);
        assert!(matches!(&changes[2], MetadataChange::SetHostVar { key, .. } if key == SUDO_VAR));
        assert!(matches!(&changes[3], MetadataChange::RemoveHostVar { key } if key == SUDO_VAR));
        assert!(matches!(&changes[4], MetadataChange::SetHostVar { value, .. } if value == "centos"));
        assert!(matches!(&changes[5], MetadataChange::RemoveHostVar { key } if key == SSH_USER_VAR));
    }

    #[tokio::test]
    async fn test_roles_overwritten_not_merged() -> Result<()> {
        let service =
            InMemoryCompute::with_servers(vec![Server::new("s1", "web-1").with_metadata(ROLES_KEY, "app")]);
        let opts = TagOptions {
            roles: vec!["web".into(), "db".into()],
            ..options()
        };
        tag_servers(&service, &["s1".to_string()], &opts).await?;
        assert_eq!(service.metadata("s1", ROLES_KEY).as_deref(), Some("web,db"));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_roles_on_untagged_server_is_fine() -> Result<()> {
        let service = InMemoryCompute::with_servers(vec![Server::new("s1", "web-1")]);
        let opts = TagOptions {
            no_roles: true,
            ..options()
        };
        tag_servers(&service, &["s1".to_string()], &opts).await?;
        assert_eq!(service.metadata("s1", ROLES_KEY), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_sudo_and_user_accumulate() -> Result<()> {
        let service = InMemoryCompute::with_servers(vec![Server::new("s1", "web-1")]);
        let opts = TagOptions {
            sudo: true,
            user: Some("centos".into()),
            ..options()
        };
        tag_servers(&service, &["web-1".to_string()], &opts).await?;

        let raw = service.metadata("s1", HOST_VARS_KEY);
        let vars = HostVars::decode(raw.as_deref())?;
        assert_eq!(vars.get(SUDO_VAR), Some("yes"));
        assert_eq!(vars.get(SSH_USER_VAR), Some("centos"));
        Ok(())
    }

    #[tokio::test]
    async fn test_conflicting_flags_remove_wins() -> Result<()> {
        let service = InMemoryCompute::with_servers(vec![Server::new("s1", "web-1")]);
        let opts = TagOptions {
            sudo: true,
            no_sudo: true,
            user: Some("centos".into()),
            ..options()
        };
        tag_servers(&service, &["s1".to_string()], &opts).await?;

        let vars = HostVars::decode(service.metadata("s1", HOST_VARS_KEY).as_deref())?;
        assert_eq!(vars.get(SUDO_VAR), None);
        assert_eq!(vars.get(SSH_USER_VAR), Some("centos"));
        Ok(())
    }

    #[tokio::test]
    async fn test_removing_last_var_deletes_field() -> Result<()> {
        let service = InMemoryCompute::with_servers(vec![
            Server::new("s1", "web-1").with_metadata(HOST_VARS_KEY, "ansible_sudo->yes"),
        ]);
        let opts = TagOptions {
            no_sudo: true,
            ..options()
        };
        tag_servers(&service, &["s1".to_string()], &opts).await?;
        assert_eq!(service.metadata("s1", HOST_VARS_KEY), None);
        assert_eq!(service.deleted_keys(), vec![("s1".to_string(), HOST_VARS_KEY.to_string())]);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_keeps_other_vars() -> Result<()> {
        let service = InMemoryCompute::with_servers(vec![Server::new("s1", "web-1")
            .with_metadata(HOST_VARS_KEY, "ansible_sudo->yes;ansible_ssh_user->centos")]);
        let opts = TagOptions {
            no_user: true,
            ..options()
        };
        tag_servers(&service, &["s1".to_string()], &opts).await?;
        assert_eq!(
            service.metadata("s1", HOST_VARS_KEY).as_deref(),
            Some("ansible_sudo->yes")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_without_field_makes_no_calls() -> Result<()> {
        let service = InMemoryCompute::with_servers(vec![Server::new("s1", "web-1")]);
        let opts = TagOptions {
            no_sudo: true,
            no_user: true,
            ..options()
        };
        tag_servers(&service, &["s1".to_string()], &opts).await?;
        assert!(service.deleted_keys().is_empty());
        assert_eq!(service.write_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_first_missing_server_aborts_batch() {
        let service = InMemoryCompute::with_servers(vec![
            Server::new("s1", "web-1"),
            Server::new("s2", "web-2"),
        ]);
        let opts = TagOptions {
            sudo: true,
            ..options()
        };
        let idents = ["s1".to_string(), "ghost-1".to_string(), "s2".to_string()];
        let result = tag_servers(&service, &idents, &opts).await;

        assert!(matches!(result, Err(Error::ServerNotFound(ref id)) if id == "ghost-1"));
        assert!(service.metadata("s1", HOST_VARS_KEY).is_some());
        assert!(service.metadata("s2", HOST_VARS_KEY).is_none());
    }

    #[tokio::test]
    async fn test_user_with_entry_separator_writes_nothing() {
        let service = InMemoryCompute::with_servers(vec![
            Server::new("s1", "web-1").with_metadata(HOST_VARS_KEY, "ansible_sudo->yes"),
        ]);
        let opts = TagOptions {
            roles: vec!["web".into()],
            user: Some("ops;admin".into()),
            ..options()
        };
        let result = tag_servers(&service, &["s1".to_string()], &opts).await;

        assert!(matches!(
            result,
            Err(Error::InvalidHostVarValue { ref key, .. }) if key == SSH_USER_VAR
        ));
        assert_eq!(service.write_count(), 0);
        assert_eq!(
            service.metadata("s1", HOST_VARS_KEY).as_deref(),
            Some("ansible_sudo->yes")
        );

        let inventory = crate::Inventory::collect(&service).await;
        assert!(inventory.is_ok());
    }

    #[tokio::test]
    async fn test_role_with_separator_writes_nothing() {
        let service = InMemoryCompute::with_servers(vec![Server::new("s1", "web-1")]);
        let opts = TagOptions {
            roles: vec!["a,b".into()],
            ..options()
        };
        let result = tag_servers(&service, &["s1".to_string()], &opts).await;

        assert!(matches!(result, Err(Error::InvalidRole(ref role)) if role == "a,b"));
        assert_eq!(service.write_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_options_checked_before_lookup() {
        let service = InMemoryCompute::with_servers(vec![]);
        let opts = TagOptions {
            user: Some("ops;admin".into()),
            ..options()
        };
        let result = tag_servers(&service, &["ghost-1".to_string()], &opts).await;
        assert!(matches!(result, Err(Error::InvalidHostVarValue { .. })));
    }

    #[tokio::test]
    async fn test_malformed_existing_vars_surface() {
        let service = InMemoryCompute::with_servers(vec![
            Server::new("s1", "web-1").with_metadata(HOST_VARS_KEY, "oops"),
        ]);
        let opts = TagOptions {
            sudo: true,
            ..options()
        };
        let result = tag_servers(&service, &["s1".to_string()], &opts).await;
        assert!(matches!(result, Err(Error::MalformedHostVar(_))));
        assert_eq!(service.write_count(), 0);
    }
}
