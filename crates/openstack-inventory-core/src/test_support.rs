//! In-memory compute service for unit tests

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::{ComputeService, Error, Result, Server};

#[derive(Debug, Default)]
struct State {
    servers: Vec<Server>,
    deleted: Vec<(String, String)>,
    writes: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryCompute {
    state: Mutex<State>,
}

impl InMemoryCompute {
    pub fn with_servers(servers: Vec<Server>) -> Self {
        Self {
            state: Mutex::new(State {
                servers,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn metadata(&self, server_id: &str, key: &str) -> Option<String> {
        self.state()
            .servers
            .iter()
            .find(|s| s.id == server_id)
            .and_then(|s| s.metadata.get(key).cloned())
    }

    pub fn deleted_keys(&self) -> Vec<(String, String)> {
        self.state().deleted.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state().writes
    }
}

#[async_trait]
impl ComputeService for InMemoryCompute {
    async fn list_servers(&self) -> Result<Vec<Server>> {
        Ok(self.state().servers.clone())
    }

    async fn find_server(&self, ident: &str) -> Result<Server> {
        let state = self.state();
        if let Some(server) = state.servers.iter().find(|s| s.id == ident) {
            return Ok(server.clone());
        }

        let mut named = state.servers.iter().filter(|s| s.name == ident);
        match (named.next(), named.next()) {
            (Some(server), None) => Ok(server.clone()),
            (Some(_), Some(_)) => Err(Error::AmbiguousServer(ident.to_string())),
            _ => Err(Error::ServerNotFound(ident.to_string())),
        }
    }

    async fn set_metadata_item(&self, server_id: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.state();
        state.writes += 1;
        let server = state
            .servers
            .iter_mut()
            .find(|s| s.id == server_id)
            .ok_or_else(|| Error::Api(format!("no server {server_id}")))?;
        server.metadata.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_metadata_item(&self, server_id: &str, key: &str) -> Result<bool> {
        let mut state = self.state();
        let removed = state
            .servers
            .iter_mut()
            .find(|s| s.id == server_id)
            .ok_or_else(|| Error::Api(format!("no server {server_id}")))?
            .metadata
            .remove(key)
            .is_some();
        if removed {
            state.deleted.push((server_id.to_string(), key.to_string()));
        }
        Ok(removed)
    }
}
