//! Keystone token request and compute endpoint lookup
//!
//! Supports the v2.0 (`/tokens`) and v3 (`/auth/tokens`) password flows.

use openstack_inventory_core::{Credentials, EndpointInterface, Error, IdentityVersion, Result};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;

const COMPUTE_SERVICE_TYPE: &str = "compute";
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// An authenticated token and the compute endpoint it is valid for
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub compute_url: Url,
}

/// Obtain a token and resolve the compute endpoint from the catalog
///
/// # Errors
///
/// `Authentication` when Keystone refuses or cannot be reached,
/// `EndpointNotFound` when the catalog has no matching compute endpoint.
pub async fn authenticate(http: &reqwest::Client, credentials: &Credentials) -> Result<Session> {
    let base = credentials.auth_url.trim_end_matches('/');
    tracing::debug!(
        auth_url = base,
        version = %credentials.identity_version,
        "requesting token"
    );

    let (token, endpoint) = match credentials.identity_version {
        IdentityVersion::V2 => authenticate_v2(http, base, credentials).await?,
        IdentityVersion::V3 => authenticate_v3(http, base, credentials).await?,
    };

    let compute_url = Url::parse(&endpoint)
        .map_err(|e| Error::EndpointNotFound(format!("invalid compute URL '{endpoint}': {e}")))?;
    tracing::debug!(compute_url = %compute_url, "authenticated");

    Ok(Session { token, compute_url })
}

#[derive(Debug, Deserialize)]
struct V2Response {
    access: V2Access,
}

#[derive(Debug, Deserialize)]
struct V2Access {
    token: V2Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<V2Service>,
}

#[derive(Debug, Deserialize)]
struct V2Token {
    id: String,
}

#[derive(Debug, Deserialize)]
struct V2Service {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<V2Endpoint>,
}

#[derive(Debug, Deserialize)]
struct V2Endpoint {
    region: Option<String>,
    #[serde(rename = "publicURL")]
    public_url: Option<String>,
    #[serde(rename = "internalURL")]
    internal_url: Option<String>,
    #[serde(rename = "adminURL")]
    admin_url: Option<String>,
}

impl V2Endpoint {
    fn url(&self, interface: EndpointInterface) -> Option<&str> {
        match interface {
            EndpointInterface::Public => self.public_url.as_deref(),
            EndpointInterface::Internal => self.internal_url.as_deref(),
            EndpointInterface::Admin => self.admin_url.as_deref(),
        }
    }
}

async fn authenticate_v2(
    http: &reqwest::Client,
    base: &str,
    credentials: &Credentials,
) -> Result<(String, String)> {
    let body = json!({
        "auth": {
            "tenantName": credentials.tenant_name,
            "passwordCredentials": {
                "username": credentials.username,
                "password": credentials.password,
            }
        }
    });

    let response = post_token_request(http, &format!("{base}/tokens"), &body).await?;
    let parsed: V2Response = response
        .json()
        .await
        .map_err(|e| Error::Authentication(format!("unreadable token response: {e}")))?;

    let region = credentials.region_name.as_deref();
    let endpoint = parsed
        .access
        .service_catalog
        .iter()
        .filter(|service| service.service_type == COMPUTE_SERVICE_TYPE)
        .flat_map(|service| service.endpoints.iter())
        .filter(|endpoint| region_matches(region, endpoint.region.as_deref(), None))
        .find_map(|endpoint| endpoint.url(credentials.interface))
        .ok_or_else(|| no_endpoint(credentials))?;

    Ok((parsed.access.token.id, endpoint.to_string()))
}

#[derive(Debug, Deserialize)]
struct V3Response {
    token: V3Token,
}

#[derive(Debug, Deserialize)]
struct V3Token {
    #[serde(default)]
    catalog: Vec<V3Service>,
}

#[derive(Debug, Deserialize)]
struct V3Service {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<V3Endpoint>,
}

#[derive(Debug, Deserialize)]
struct V3Endpoint {
    interface: String,
    region: Option<String>,
    region_id: Option<String>,
    url: String,
}

async fn authenticate_v3(
    http: &reqwest::Client,
    base: &str,
    credentials: &Credentials,
) -> Result<(String, String)> {
    let body = json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": credentials.username,
                        "domain": { "name": credentials.user_domain_name },
                        "password": credentials.password,
                    }
                }
            },
            "scope": {
                "project": {
                    "name": credentials.tenant_name,
                    "domain": { "name": credentials.project_domain_name },
                }
            }
        }
    });

    let response = post_token_request(http, &format!("{base}/auth/tokens"), &body).await?;
    let token = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| Error::Authentication(format!("response has no {SUBJECT_TOKEN_HEADER}")))?;

    let parsed: V3Response = response
        .json()
        .await
        .map_err(|e| Error::Authentication(format!("unreadable token response: {e}")))?;

    let interface = credentials.interface.to_string();
    let region = credentials.region_name.as_deref();
    let endpoint = parsed
        .token
        .catalog
        .iter()
        .filter(|service| service.service_type == COMPUTE_SERVICE_TYPE)
        .flat_map(|service| service.endpoints.iter())
        .find(|endpoint| {
            endpoint.interface == interface
                && region_matches(
                    region,
                    endpoint.region.as_deref(),
                    endpoint.region_id.as_deref(),
                )
        })
        .map(|endpoint| endpoint.url.clone())
        .ok_or_else(|| no_endpoint(credentials))?;

    Ok((token, endpoint))
}

async fn post_token_request(
    http: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
) -> Result<reqwest::Response> {
    let response = http
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| Error::Authentication(format!("request to {url} failed: {e}")))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response.text().await.unwrap_or_default();
    let reason = if status == StatusCode::UNAUTHORIZED {
        "invalid credentials".to_string()
    } else {
        format!("{status}")
    };
    Err(Error::Authentication(format!("{reason}: {}", detail.trim())))
}

fn region_matches(wanted: Option<&str>, region: Option<&str>, region_id: Option<&str>) -> bool {
    wanted.map_or(true, |wanted| {
        region == Some(wanted) || region_id == Some(wanted)
    })
}

fn no_endpoint(credentials: &Credentials) -> Error {
    let region = credentials.region_name.as_deref().unwrap_or("any");
    Error::EndpointNotFound(format!(
        "interface {} in region {region}",
        credentials.interface
    ))
}
