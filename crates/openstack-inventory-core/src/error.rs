//! Error types for openstack-inventory-core

use thiserror::Error;

/// Exit status for configuration failures (the `-1` of a shell script).
pub const CONFIG_EXIT_CODE: i32 = 255;

/// Core error type for inventory operations
#[derive(Debug, Error)]
pub enum Error {
    /// A required environment variable is absent
    #[error("environment variable {0} is not defined")]
    MissingVariable(String),

    /// An environment variable holds a value we cannot use
    #[error("environment variable {name} has invalid value '{value}': {reason}")]
    InvalidVariable {
        name: String,
        value: String,
        reason: String,
    },

    /// No server matches the identifier
    #[error("Server {0} not found")]
    ServerNotFound(String),

    /// More than one server carries the given name
    #[error("More than one server matches {0}")]
    AmbiguousServer(String),

    /// An `ansible_host_vars` entry without a `->` separator or key
    #[error("malformed host variable entry '{0}': expected key->value")]
    MalformedHostVar(String),

    /// A server carries an `ansible_host_vars` field that does not decode
    #[error("server {server} has malformed host variable entry '{entry}': expected key->value")]
    InvalidHostVars { server: String, entry: String },

    /// A host variable that cannot be packed into `ansible_host_vars`
    #[error("host variable {key} cannot be stored: {reason}")]
    InvalidHostVarValue { key: String, reason: String },

    /// A role name that cannot be packed into `roles`
    #[error("role '{0}' cannot be stored: role names must be non-empty and contain no ','")]
    InvalidRole(String),

    /// Identity service rejected or failed the token request
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Service catalog has no usable compute endpoint
    #[error("No compute endpoint found in service catalog: {0}")]
    EndpointNotFound(String),

    /// Compute API request failed
    #[error("Compute API error: {0}")]
    Api(String),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error comes from the environment rather than the cloud
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::MissingVariable(_) | Self::InvalidVariable { .. })
    }

    /// Process exit status for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.is_config() {
            CONFIG_EXIT_CODE
        } else {
            1
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for inventory operations
pub type Result<T> = std::result::Result<T, Error>;
