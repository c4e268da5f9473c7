//! `--host <address>`: variables for a single host

use std::collections::BTreeMap;

use anyhow::Result;
use openstack_inventory_core::{inventory::to_json_pretty, ComputeService, HostVarValue, Inventory};

/// Render the host variables recorded for `address`, `{}` when there are none
///
/// # Errors
///
/// Same failures as the full listing.
pub async fn run(service: &dyn ComputeService, address: &str) -> Result<String> {
    let inventory = Inventory::collect(service).await?;
    let empty = BTreeMap::<String, HostVarValue>::new();
    let vars = inventory.host_vars(address).unwrap_or(&empty);
    Ok(to_json_pretty(vars)?)
}
