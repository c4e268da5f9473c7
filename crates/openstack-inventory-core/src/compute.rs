//! Port to the remote compute service

use async_trait::async_trait;

use crate::{Result, Server};

/// The slice of the compute API the inventory needs
///
/// Callers await each request before issuing the next one.
#[async_trait]
pub trait ComputeService: Send + Sync {
    /// All servers visible to the tenant, networks in service order
    async fn list_servers(&self) -> Result<Vec<Server>>;

    /// Resolve an id or exact name to a server
    ///
    /// # Errors
    ///
    /// `ServerNotFound` when nothing matches, `AmbiguousServer` when a name
    /// matches more than one server.
    async fn find_server(&self, ident: &str) -> Result<Server>;

    /// Set a single metadata field, replacing any previous value
    async fn set_metadata_item(&self, server_id: &str, key: &str, value: &str) -> Result<()>;

    /// Delete a single metadata field
    ///
    /// Returns `false` when the field was already absent.
    async fn delete_metadata_item(&self, server_id: &str, key: &str) -> Result<bool>;
}
