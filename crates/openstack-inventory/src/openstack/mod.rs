//! OpenStack HTTP plumbing: Keystone authentication and the Nova API

pub mod compute;
pub mod identity;

pub use compute::NovaClient;
pub use identity::{authenticate, Session};
