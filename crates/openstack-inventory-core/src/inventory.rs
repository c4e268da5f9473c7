//! Ansible dynamic inventory assembly
//!
//! Output shape:
//!
//! ```json
//! {
//!     "web": { "hosts": ["10.0.0.5"] },
//!     "_meta": { "hostvars": { "10.0.0.5": { "ansible_sudo": "yes" } } }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    metadata::{decode_roles, HostVars, HOST_VARS_KEY, ROLES_KEY},
    ComputeService, Error, Result, Server,
};

/// Reserved top-level key for per-host variables
pub const META_KEY: &str = "_meta";

/// A host variable as Ansible sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HostVarValue {
    Scalar(String),
    List(Vec<String>),
}

impl From<&str> for HostVarValue {
    /// Raw values containing a comma become lists
    fn from(raw: &str) -> Self {
        if raw.contains(',') {
            Self::List(raw.split(',').map(str::to_string).collect())
        } else {
            Self::Scalar(raw.to_string())
        }
    }
}

/// Hosts in one group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HostGroup {
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
struct Meta {
    hostvars: BTreeMap<String, BTreeMap<String, HostVarValue>>,
}

/// The document printed for `--list`
///
/// Groups keep the order in which they were first seen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inventory {
    groups: Vec<(String, HostGroup)>,
    meta: Meta,
}

impl Inventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the inventory from every server the service lists
    ///
    /// # Errors
    ///
    /// Propagates service failures, and `InvalidHostVars` if a server's
    /// `ansible_host_vars` field does not decode.
    pub async fn collect(service: &dyn ComputeService) -> Result<Self> {
        let servers = service.list_servers().await?;
        tracing::debug!(count = servers.len(), "fetched servers");
        Self::from_servers(&servers)
    }

    /// Fold servers into groups and host variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidHostVars` naming the first server whose host
    /// variables do not decode.
    pub fn from_servers(servers: &[Server]) -> Result<Self> {
        let mut inventory = Self::new();
        for server in servers {
            inventory.add_server(server)?;
        }
        Ok(inventory)
    }

    fn add_server(&mut self, server: &Server) -> Result<()> {
        let Some(address) = server.primary_address() else {
            tracing::debug!(server = %server.id, "no floating or fixed address, skipping");
            return Ok(());
        };

        for group in decode_roles(server.metadata_value(ROLES_KEY)) {
            self.add_host(&group, address);
        }

        let host_vars =
            HostVars::decode(server.metadata_value(HOST_VARS_KEY)).map_err(|err| match err {
                Error::MalformedHostVar(entry) => Error::InvalidHostVars {
                    server: server.id.clone(),
                    entry,
                },
                other => other,
            })?;
        if !host_vars.is_empty() {
            self.merge_host_vars(address, &host_vars);
        }
        Ok(())
    }

    /// Append a host to a group, creating the group on first use
    ///
    /// Duplicates are kept. The reserved `_meta` name is refused.
    pub fn add_host(&mut self, group: &str, address: &str) {
        if group == META_KEY {
            tracing::warn!(address, "ignoring role named {META_KEY}");
            return;
        }

        match self.groups.iter_mut().find(|(name, _)| name == group) {
            Some((_, hosts)) => hosts.hosts.push(address.to_string()),
            None => self.groups.push((
                group.to_string(),
                HostGroup {
                    hosts: vec![address.to_string()],
                },
            )),
        }
    }

    /// Merge variables into `_meta.hostvars[address]`; later keys overwrite
    pub fn merge_host_vars(&mut self, address: &str, host_vars: &HostVars) {
        let entry = self.meta.hostvars.entry(address.to_string()).or_default();
        for (key, value) in host_vars.iter() {
            entry.insert(key.to_string(), HostVarValue::from(value));
        }
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&HostGroup> {
        self.groups
            .iter()
            .find(|(group, _)| group == name)
            .map(|(_, hosts)| hosts)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    /// Variables for one host, if any were recorded
    #[must_use]
    pub fn host_vars(&self, address: &str) -> Option<&BTreeMap<String, HostVarValue>> {
        self.meta.hostvars.get(address)
    }

    /// Render as JSON indented by four spaces
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        to_json_pretty(self)
    }
}

impl Serialize for Inventory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len() + 1))?;
        for (name, hosts) in &self.groups {
            map.serialize_entry(name, hosts)?;
        }
        map.serialize_entry(META_KEY, &self.meta)?;
        map.end()
    }
}

/// Serialize any value as JSON with a four-space indent
///
/// # Errors
///
/// Returns `Serialization` if encoding fails.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| Error::Serialization(e.to_string()))
}
