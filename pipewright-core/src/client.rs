// pipewright-core/src/client.rs
// Explicitly opened and shut down store client

use crate::config::ClientConfig;
use crate::error::{PipelineError, Result};
use crate::logging::set_log_level;
use crate::stage::Pipeline;
use crate::store::{DocumentStore, Namespace};
use crate::{log_debug, log_error, log_info};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientState {
    Open,
    Closed,
}

struct Shared<S> {
    store: S,
    state: RwLock<ClientState>,
}

impl<S: DocumentStore> Shared<S> {
    /// Runs `f` under the read lock so shutdown waits for in-flight calls.
    ///
    /// The lock is taken recursively: `f` may call back into the client even
    /// while a shutdown is queued for the write lock.
    fn with_store<R>(&self, f: impl FnOnce(&S) -> Result<R>) -> Result<R> {
        let state = self.state.read_recursive();
        if *state == ClientState::Closed {
            return Err(PipelineError::ClientClosed);
        }
        f(&self.store)
    }

    /// Disconnects the store the first time; later calls are no-ops.
    fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        if *state == ClientState::Closed {
            return Ok(());
        }
        *state = ClientState::Closed;
        self.store.disconnect()
    }
}

/// Owner of the store connection.
///
/// There is no global instance: open a client at startup, hand out
/// [`Database`] handles, and call [`shutdown`](Client::shutdown) at exit.
/// Dropping the client shuts it down too. Handles that outlive the client
/// fail with `ClientClosed`.
pub struct Client<S: DocumentStore> {
    shared: Arc<Shared<S>>,
    config: ClientConfig,
}

impl<S: DocumentStore> Client<S> {
    /// Validate `config`, apply its log level and connect `store`.
    pub fn open(config: ClientConfig, store: S) -> Result<Self> {
        config.validate()?;
        if let Some(level) = config.parsed_log_level()? {
            set_log_level(level);
        }

        store.connect(&config)?;
        log_info!("client connected to {}", config.redacted_uri());

        Ok(Client {
            shared: Arc::new(Shared {
                store,
                state: RwLock::new(ClientState::Open),
            }),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        *self.shared.state.read_recursive() == ClientState::Open
    }

    pub fn database(&self, name: impl Into<String>) -> Database<S> {
        Database {
            shared: Arc::clone(&self.shared),
            name: name.into(),
        }
    }

    /// Handle to `config.default_database`.
    pub fn default_database(&self) -> Database<S> {
        self.database(self.config.default_database.clone())
    }

    /// Disconnect the store. Errors from the driver are returned; the client
    /// counts as closed either way.
    pub fn shutdown(self) -> Result<()> {
        let result = self.shared.close();
        log_info!("client shut down");
        result
    }
}

impl<S: DocumentStore> Drop for Client<S> {
    fn drop(&mut self) {
        if let Err(err) = self.shared.close() {
            log_error!("disconnect on drop failed: {}", err);
        }
    }
}

/// Named database on an open client. Cheap to clone.
pub struct Database<S: DocumentStore> {
    shared: Arc<Shared<S>>,
    name: String,
}

impl<S: DocumentStore> Clone for Database<S> {
    fn clone(&self) -> Self {
        Database {
            shared: Arc::clone(&self.shared),
            name: self.name.clone(),
        }
    }
}

impl<S: DocumentStore> Database<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self, collection: &str) -> Namespace {
        Namespace::new(self.name.clone(), collection)
    }

    /// Run `f` against the store, or fail with `ClientClosed`.
    ///
    /// A pending shutdown waits until `f` returns. Nested calls from inside
    /// `f` are allowed.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> Result<R>) -> Result<R> {
        self.shared.with_store(f)
    }

    /// Run a built pipeline on `collection` and return raw documents.
    pub fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>> {
        let ns = self.namespace(collection);
        log_debug!("aggregate on {} with {} stages", ns, pipeline.len());
        self.with_store(|store| store.aggregate(&ns, pipeline))
    }

    /// Like [`aggregate`](Self::aggregate), decoding each document into `R`.
    pub fn aggregate_as<R: DeserializeOwned>(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<R>> {
        self.aggregate(collection, pipeline)?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(PipelineError::from))
            .collect()
    }
}
