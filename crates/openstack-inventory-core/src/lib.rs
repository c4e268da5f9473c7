//! openstack-inventory-core - Core types and logic
//!
//! This crate provides:
//! - Credential loading from the `OS_*` environment
//! - Server and address types with primary address resolution
//! - The `ansible_host_vars` / `roles` metadata codec
//! - Ansible dynamic inventory assembly
//! - The ordered metadata changes behind the tagging flags

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod compute;
pub mod credentials;
pub mod error;
pub mod inventory;
pub mod metadata;
pub mod server;
pub mod tagging;

#[cfg(test)]
pub(crate) mod test_support;

pub use compute::ComputeService;
pub use credentials::{ComputeApiVersion, Credentials, EndpointInterface, IdentityVersion};
pub use error::{Error, Result};
pub use inventory::{HostGroup, HostVarValue, Inventory};
pub use metadata::{HostVars, HOST_VARS_KEY, ROLES_KEY};
pub use server::{Address, AddressKind, Network, Server};
pub use tagging::{MetadataChange, TagOptions};
