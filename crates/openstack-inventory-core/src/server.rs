//! Compute server types and primary address resolution

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::Display;

/// How an address is attached to a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AddressKind {
    /// Externally routable address
    Floating,
    /// Address on the tenant network
    Fixed,
    /// Anything the service reports we do not care about
    #[serde(other)]
    Other,
}

impl AddressKind {
    /// Map an `OS-EXT-IPS:type` value; unknown or missing types are `Other`
    #[must_use]
    pub fn from_type(value: Option<&str>) -> Self {
        match value {
            Some("floating") => Self::Floating,
            Some("fixed") => Self::Fixed,
            _ => Self::Other,
        }
    }
}

/// One address entry on a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub addr: String,
    pub kind: AddressKind,
}

impl Address {
    #[must_use]
    pub fn new(addr: impl Into<String>, kind: AddressKind) -> Self {
        Self {
            addr: addr.into(),
            kind,
        }
    }
}

/// A named network with its addresses, in service order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub addresses: Vec<Address>,
}

/// A compute server as seen by the inventory
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    /// Networks in the order the compute service listed them
    pub networks: Vec<Network>,
    pub metadata: BTreeMap<String, String>,
}

impl Server {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_network(mut self, name: impl Into<String>, addresses: Vec<Address>) -> Self {
        self.networks.push(Network {
            name: name.into(),
            addresses,
        });
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Read a metadata field
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// The address Ansible should connect to
    ///
    /// Only the first network is consulted; hosts are assumed to sit on a
    /// single relevant network. Floating beats fixed. Within a kind the last
    /// entry listed wins.
    #[must_use]
    pub fn primary_address(&self) -> Option<&str> {
        let network = self.networks.first()?;
        let last_of = |kind: AddressKind| {
            network
                .addresses
                .iter()
                .rev()
                .find(|address| address.kind == kind)
                .map(|address| address.addr.as_str())
        };

        last_of(AddressKind::Floating).or_else(|| last_of(AddressKind::Fixed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floating_preferred_over_fixed() {
        let server = Server::new("a", "a").with_network(
            "private",
            vec![
                Address::new("192.168.0.4", AddressKind::Fixed),
                Address::new("10.0.0.5", AddressKind::Floating),
            ],
        );
        assert_eq!(server.primary_address(), Some("10.0.0.5"));
    }

    #[test]
    fn test_fixed_used_without_floating() {
        let server = Server::new("b", "b").with_network(
            "provider",
            vec![Address::new("192.168.1.10", AddressKind::Fixed)],
        );
        assert_eq!(server.primary_address(), Some("192.168.1.10"));
    }

    #[test]
    fn test_no_usable_address() {
        let server = Server::new("c", "c")
            .with_network("odd", vec![Address::new("fe80::1", AddressKind::Other)]);
        assert_eq!(server.primary_address(), None);
        assert_eq!(Server::new("d", "d").primary_address(), None);
    }

    #[test]
    fn test_only_first_network_consulted() {
        let server = Server::new("e", "e")
            .with_network("first", vec![Address::new("fe80::2", AddressKind::Other)])
            .with_network(
                "second",
                vec![Address::new("10.0.0.9", AddressKind::Floating)],
            );
        assert_eq!(server.primary_address(), None);
    }

    #[test]
    fn test_last_entry_of_kind_wins() {
        let server = Server::new("f", "f").with_network(
            "private",
            vec![
                Address::new("192.168.0.4", AddressKind::Fixed),
                Address::new("192.168.0.5", AddressKind::Fixed),
            ],
        );
        assert_eq!(server.primary_address(), Some("192.168.0.5"));
    }

    #[test]
    fn test_address_kind_parsing() {
        assert_eq!(AddressKind::from_type(Some("floating")), AddressKind::Floating);
        assert_eq!(AddressKind::from_type(Some("fixed")), AddressKind::Fixed);
        assert_eq!(AddressKind::from_type(Some("shared")), AddressKind::Other);
        assert_eq!(AddressKind::from_type(None), AddressKind::Other);
        assert_eq!(AddressKind::Floating.to_string(), "floating");
    }
}
