//! `--list`: the full inventory document

use anyhow::Result;
use openstack_inventory_core::{ComputeService, Inventory};

/// Build the inventory and render it as indented JSON
///
/// # Errors
///
/// Returns an error if the servers cannot be listed or a server carries
/// undecodable host variables.
pub async fn run(service: &dyn ComputeService) -> Result<String> {
    let inventory = Inventory::collect(service).await?;
    Ok(inventory.to_json_pretty()?)
}
