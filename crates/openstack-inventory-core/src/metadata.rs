//! Metadata field codec
//!
//! Host variables live in a single `ansible_host_vars` field packed as
//! `key->value;key->value`. Roles live in `roles` as a comma list. The
//! delimiters never leave this module.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{Error, Result};

/// Metadata field holding the packed host variables
pub const HOST_VARS_KEY: &str = "ansible_host_vars";
/// Metadata field holding the comma-separated role list
pub const ROLES_KEY: &str = "roles";
/// Group used for servers without roles
pub const DEFAULT_GROUP: &str = "default";

const ENTRY_SEPARATOR: &str = ";";
const KEY_VALUE_SEPARATOR: &str = "->";
const ROLE_SEPARATOR: &str = ",";

/// Ansible host variables stored on a server
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostVars(BTreeMap<String, String>);

impl HostVars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unpack a raw `ansible_host_vars` value
    ///
    /// Absent or empty input gives an empty map and empty segments are
    /// skipped. Each entry is split at its first `->`; a repeated key keeps
    /// the last value.
    ///
    /// # Errors
    ///
    /// Returns `MalformedHostVar` for an entry without `->` or with an
    /// empty key.
    pub fn decode(raw: Option<&str>) -> Result<Self> {
        raw.unwrap_or_default()
            .split(ENTRY_SEPARATOR)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once(KEY_VALUE_SEPARATOR) {
                Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
                _ => Err(Error::MalformedHostVar(entry.to_string())),
            })
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Self)
    }

    /// Pack into the `ansible_host_vars` wire form. Entry order is not part
    /// of the format.
    #[must_use]
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| format!("{key}{KEY_VALUE_SEPARATOR}{value}"))
            .join(ENTRY_SEPARATOR)
    }

    /// Insert or replace a variable
    ///
    /// # Errors
    ///
    /// Returns `InvalidHostVarValue` when the pair would not survive a
    /// round trip through [`HostVars::encode`] and [`HostVars::decode`].
    pub fn upsert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        check_host_var(&key, &value)?;
        self.0.insert(key, value);
        Ok(())
    }

    /// Remove a variable, returning its old value if it was set
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for HostVars {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Check that a host variable can be packed
///
/// Keys must be non-empty and free of `;` and `->`. Values must be free of
/// `;`; a `->` in a value is kept since entries split at the first one.
///
/// # Errors
///
/// Returns `InvalidHostVarValue` naming the offending key.
pub fn check_host_var(key: &str, value: &str) -> Result<()> {
    let reason = if key.is_empty() {
        "the name is empty"
    } else if key.contains(ENTRY_SEPARATOR) || key.contains(KEY_VALUE_SEPARATOR) {
        "the name contains ';' or '->'"
    } else if value.contains(ENTRY_SEPARATOR) {
        "the value contains ';'"
    } else {
        return Ok(());
    };
    Err(Error::InvalidHostVarValue {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

/// Check that a role name can be packed into `roles`
///
/// # Errors
///
/// Returns `InvalidRole` for an empty name or one containing `,`.
pub fn check_role(role: &str) -> Result<()> {
    if role.is_empty() || role.contains(ROLE_SEPARATOR) {
        return Err(Error::InvalidRole(role.to_string()));
    }
    Ok(())
}

/// Groups a server belongs to, from its raw `roles` field
///
/// Missing, empty or all-blank input falls back to the `default` group.
#[must_use]
pub fn decode_roles(raw: Option<&str>) -> Vec<String> {
    let roles: Vec<String> = raw
        .unwrap_or_default()
        .split(ROLE_SEPARATOR)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect();

    if roles.is_empty() {
        vec![DEFAULT_GROUP.to_string()]
    } else {
        roles
    }
}

/// Pack role names into the `roles` field value
///
/// # Errors
///
/// Returns `InvalidRole` for the first name [`check_role`] refuses.
pub fn encode_roles<S: AsRef<str>>(roles: &[S]) -> Result<String> {
    roles
        .iter()
        .map(AsRef::as_ref)
        .try_for_each(check_role)?;
    Ok(roles.iter().map(AsRef::as_ref).join(ROLE_SEPARATOR))
}
