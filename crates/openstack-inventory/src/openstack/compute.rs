//! Nova client implementing [`ComputeService`]

use std::collections::BTreeMap;

use async_trait::async_trait;
use openstack_inventory_core::{
    Address, AddressKind, ComputeService, Credentials, Error, Network, Result, Server,
};
use reqwest::{header, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use super::identity::{authenticate, Session};

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const LEGACY_MICROVERSION_HEADER: &str = "X-OpenStack-Nova-API-Version";
const MICROVERSION_HEADER: &str = "OpenStack-API-Version";

/// Authenticated client for the compute API
#[derive(Debug, Clone)]
pub struct NovaClient {
    http: reqwest::Client,
    session: Session,
    microversion: Option<String>,
}

impl NovaClient {
    /// Authenticate against Keystone and build a client for its compute endpoint
    ///
    /// # Errors
    ///
    /// `Authentication` / `EndpointNotFound` from the identity exchange, or
    /// `Api` if the HTTP client cannot be built.
    pub async fn connect(credentials: &Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("openstack-inventory/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Api(format!("cannot build HTTP client: {e}")))?;
        let session = authenticate(&http, credentials).await?;
        Ok(Self::new(http, session, credentials.api_version.microversion()))
    }

    #[must_use]
    pub const fn new(http: reqwest::Client, session: Session, microversion: Option<String>) -> Self {
        Self {
            http,
            session,
            microversion,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let base = &self.session.compute_url;
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Api(format!("compute URL {base} cannot take a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "compute request");
        let builder = self
            .http
            .request(method, url)
            .header(AUTH_TOKEN_HEADER, &self.session.token)
            .header(header::ACCEPT, "application/json");

        match &self.microversion {
            Some(version) => builder
                .header(LEGACY_MICROVERSION_HEADER, version)
                .header(MICROVERSION_HEADER, format!("compute {version}")),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| Error::Api(format!("request failed: {e}")))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Api(format!("unreadable response: {e}")))
    }

    async fn list_by_name(&self, name: &str) -> Result<Vec<Server>> {
        let url = self.url(&["servers", "detail"])?;
        let response = Self::send(self.request(Method::GET, url).query(&[("name", name)])).await?;
        let list: ServerList = Self::read_json(response).await?;
        list.servers
            .into_iter()
            .filter(|server| server.name == name)
            .map(Server::try_from)
            .collect()
    }
}

#[async_trait]
impl ComputeService for NovaClient {
    async fn list_servers(&self) -> Result<Vec<Server>> {
        let url = self.url(&["servers", "detail"])?;
        let response = Self::send(self.request(Method::GET, url)).await?;
        let list: ServerList = Self::read_json(response).await?;
        list.servers.into_iter().map(Server::try_from).collect()
    }

    async fn find_server(&self, ident: &str) -> Result<Server> {
        let url = self.url(&["servers", ident])?;
        let response = Self::send(self.request(Method::GET, url)).await?;

        if !matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST) {
            let envelope: ServerEnvelope = Self::read_json(response).await?;
            return Server::try_from(envelope.server);
        }

        tracing::debug!(ident, "no server with that id, trying by name");
        let mut matches = self.list_by_name(ident).await?;
        match matches.len() {
            0 => Err(Error::ServerNotFound(ident.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::AmbiguousServer(ident.to_string())),
        }
    }

    async fn set_metadata_item(&self, server_id: &str, key: &str, value: &str) -> Result<()> {
        let url = self.url(&["servers", server_id, "metadata", key])?;
        let body = json!({ "meta": { key: value } });
        let response = Self::send(self.request(Method::PUT, url).json(&body)).await?;
        ensure_success(response).await.map(drop)
    }

    async fn delete_metadata_item(&self, server_id: &str, key: &str) -> Result<bool> {
        let url = self.url(&["servers", server_id, "metadata", key])?;
        let response = Self::send(self.request(Method::DELETE, url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response).await.map(|_| true)
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api(format!("{status} from {url}: {}", body.trim())))
}

#[derive(Debug, Deserialize)]
struct ServerList {
    servers: Vec<WireServer>,
}

#[derive(Debug, Deserialize)]
struct ServerEnvelope {
    server: WireServer,
}

#[derive(Debug, Deserialize)]
struct WireServer {
    id: String,
    #[serde(default)]
    name: String,
    /// Network name to address list, in the order Nova sent them
    #[serde(default)]
    addresses: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct WireAddress {
    addr: String,
    #[serde(rename = "OS-EXT-IPS:type")]
    kind: Option<String>,
}

impl TryFrom<WireServer> for Server {
    type Error = Error;

    fn try_from(wire: WireServer) -> Result<Self> {
        let networks = wire
            .addresses
            .unwrap_or_default()
            .into_iter()
            .map(|(name, entries)| -> Result<Network> {
                let entries: Vec<WireAddress> = serde_json::from_value(entries)?;
                let addresses = entries
                    .into_iter()
                    .map(|entry| {
                        let kind = AddressKind::from_type(entry.kind.as_deref());
                        Address::new(entry.addr, kind)
                    })
                    .collect();
                Ok(Network { name, addresses })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: wire.id,
            name: wire.name,
            networks,
            metadata: wire.metadata.unwrap_or_default(),
        })
    }
}
