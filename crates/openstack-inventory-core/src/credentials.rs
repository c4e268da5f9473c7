//! Connection settings read from the `OS_*` environment
//!
//! Built once at startup and passed by reference to the client. Nothing
//! else in the crate reads the environment.

use std::{fmt, str::FromStr};

use strum::{Display, EnumString};

use crate::{Error, Result};

pub const COMPUTE_API_VERSION_VAR: &str = "OS_COMPUTE_API_VERSION";
pub const USERNAME_VAR: &str = "OS_USERNAME";
pub const PASSWORD_VAR: &str = "OS_PASSWORD";
pub const TENANT_NAME_VAR: &str = "OS_TENANT_NAME";
pub const AUTH_URL_VAR: &str = "OS_AUTH_URL";
pub const IDENTITY_API_VERSION_VAR: &str = "OS_IDENTITY_API_VERSION";
pub const USER_DOMAIN_NAME_VAR: &str = "OS_USER_DOMAIN_NAME";
pub const PROJECT_DOMAIN_NAME_VAR: &str = "OS_PROJECT_DOMAIN_NAME";
pub const REGION_NAME_VAR: &str = "OS_REGION_NAME";
pub const INTERFACE_VAR: &str = "OS_INTERFACE";

const DEFAULT_DOMAIN: &str = "Default";

/// Compute API version: `2`, a `2.<minor>` microversion, or `2.latest`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComputeApiVersion {
    minor: Option<Microversion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Microversion {
    Numbered(u32),
    Latest,
}

impl ComputeApiVersion {
    /// Microversion header value, `None` for the plain `2` API
    #[must_use]
    pub fn microversion(self) -> Option<String> {
        self.minor.map(|minor| match minor {
            Microversion::Numbered(minor) => format!("2.{minor}"),
            Microversion::Latest => "latest".to_string(),
        })
    }
}

impl FromStr for ComputeApiVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().split_once('.') {
            None if s.trim() == "2" => Ok(Self::default()),
            Some(("2", "latest")) => Ok(Self {
                minor: Some(Microversion::Latest),
            }),
            Some(("2", minor)) => minor
                .parse::<u32>()
                .map(|minor| Self {
                    minor: Some(Microversion::Numbered(minor)),
                })
                .map_err(|_| format!("'{minor}' is not a numeric microversion or 'latest'")),
            _ => Err("only compute API version 2, 2.x and 2.latest are supported".to_string()),
        }
    }
}

impl fmt::Display for ComputeApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(Microversion::Numbered(minor)) => write!(f, "2.{minor}"),
            Some(Microversion::Latest) => write!(f, "2.latest"),
            None => write!(f, "2"),
        }
    }
}

/// Keystone API flavour used to obtain a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum IdentityVersion {
    #[strum(to_string = "2.0")]
    V2,
    #[strum(to_string = "3")]
    V3,
}

impl IdentityVersion {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().trim_start_matches(['v', 'V']) {
            "2" | "2.0" => Some(Self::V2),
            "3" | "3.0" => Some(Self::V3),
            _ => None,
        }
    }

    /// Guess from the auth URL path: `.../v3` means v3, anything else v2.0
    #[must_use]
    pub fn infer(auth_url: &str) -> Self {
        if auth_url.trim_end_matches('/').ends_with("/v3") {
            Self::V3
        } else {
            Self::V2
        }
    }
}

/// Which catalog endpoint to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum EndpointInterface {
    #[default]
    #[strum(to_string = "public", serialize = "publicURL")]
    Public,
    #[strum(to_string = "internal", serialize = "internalURL")]
    Internal,
    #[strum(to_string = "admin", serialize = "adminURL")]
    Admin,
}

impl EndpointInterface {
    /// Key used by Keystone v2.0 catalog entries (`publicURL` and friends)
    #[must_use]
    pub const fn v2_url_key(self) -> &'static str {
        match self {
            Self::Public => "publicURL",
            Self::Internal => "internalURL",
            Self::Admin => "adminURL",
        }
    }
}

/// Connection parameters for the identity and compute services
#[derive(Clone)]
pub struct Credentials {
    pub api_version: ComputeApiVersion,
    pub username: String,
    pub password: String,
    pub tenant_name: String,
    pub auth_url: String,
    pub identity_version: IdentityVersion,
    pub user_domain_name: String,
    pub project_domain_name: String,
    pub region_name: Option<String>,
    pub interface: EndpointInterface,
}

impl Credentials {
    /// Load credentials from the process environment
    ///
    /// # Errors
    ///
    /// Returns `MissingVariable` for the first absent required variable,
    /// `InvalidVariable` for an optional one that does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load credentials through an arbitrary variable lookup
    ///
    /// Required variables are checked in a fixed order so the first
    /// missing one is the one reported.
    ///
    /// # Errors
    ///
    /// Same as [`Credentials::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |name: &str| lookup(name).ok_or_else(|| Error::MissingVariable(name.to_string()));

        let api_version = lookup(COMPUTE_API_VERSION_VAR)
            .map(|value| {
                parse_var(COMPUTE_API_VERSION_VAR, &value, |v| {
                    v.parse::<ComputeApiVersion>()
                })
            })
            .transpose()?
            .unwrap_or_default();

        let username = required(USERNAME_VAR)?;
        let password = required(PASSWORD_VAR)?;
        let tenant_name = required(TENANT_NAME_VAR)?;
        let auth_url = required(AUTH_URL_VAR)?;

        let identity_version = match lookup(IDENTITY_API_VERSION_VAR) {
            Some(value) => parse_var(IDENTITY_API_VERSION_VAR, &value, |v| {
                IdentityVersion::parse(v).ok_or_else(|| "expected 2.0 or 3".to_string())
            })?,
            None => IdentityVersion::infer(&auth_url),
        };

        let interface = lookup(INTERFACE_VAR)
            .map(|value| {
                parse_var(INTERFACE_VAR, &value, |v| {
                    v.parse::<EndpointInterface>().map_err(|e| e.to_string())
                })
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            api_version,
            username,
            password,
            tenant_name,
            auth_url,
            identity_version,
            user_domain_name: lookup(USER_DOMAIN_NAME_VAR)
                .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            project_domain_name: lookup(PROJECT_DOMAIN_NAME_VAR)
                .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            region_name: lookup(REGION_NAME_VAR).filter(|region| !region.is_empty()),
            interface,
        })
    }
}

fn parse_var<T>(
    name: &str,
    value: &str,
    parse: impl FnOnce(&str) -> std::result::Result<T, String>,
) -> Result<T> {
    parse(value).map_err(|reason| Error::InvalidVariable {
        name: name.to_string(),
        value: value.to_string(),
        reason,
    })
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_version", &self.api_version)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tenant_name", &self.tenant_name)
            .field("auth_url", &self.auth_url)
            .field("identity_version", &self.identity_version)
            .field("region_name", &self.region_name)
            .field("interface", &self.interface)
            .finish_non_exhaustive()
    }
}
