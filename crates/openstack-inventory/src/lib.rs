//! openstack-inventory - Ansible dynamic inventory for OpenStack
//!
//! Lists compute servers as an Ansible inventory document, and tags servers
//! with roles and connection variables stored in their metadata.

pub mod cli;
pub mod commands;
pub mod openstack;
