//! Tagging servers with roles and connection variables

use anyhow::Result;
use openstack_inventory_core::{tagging, ComputeService, TagOptions};

/// Apply the tagging flags to every named server, in order
///
/// # Errors
///
/// Stops at the first server that cannot be resolved or updated.
pub async fn run(service: &dyn ComputeService, servers: &[String], options: &TagOptions) -> Result<()> {
    if options.is_empty() {
        tracing::debug!("no tagging flags given, only resolving servers");
    }
    tagging::tag_servers(service, servers, options).await?;
    Ok(())
}
