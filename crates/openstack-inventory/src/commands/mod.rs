//! Command implementations
//!
//! Each command works against any [`ComputeService`](openstack_inventory_core::ComputeService)
//! and returns what should be printed, leaving output to the handlers.

pub mod host;
pub mod list;
pub mod tag;
