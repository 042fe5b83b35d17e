// pipewright-core/src/store.rs
//! Document store boundary
//!
//! The builder never executes anything. A [`DocumentStore`] is whatever
//! driver the caller plugs into a [`Client`](crate::Client); it receives
//! built pipelines and plain JSON filters/updates and returns raw documents.
//!
//! ```text
//! StageBuilder ──build()──▶ Pipeline ──┐
//!                                      ▼
//! Repository<T> ──▶ Database ──▶ DocumentStore (driver)
//! ```
//!
//! Driver failures should be wrapped with [`PipelineError::store`] so they
//! reach the caller unchanged.
//!
//! [`PipelineError::store`]: crate::PipelineError::store

use crate::config::ClientConfig;
use crate::error::Result;
use crate::stage::Pipeline;
use serde_json::Value;
use std::fmt;

/// Database + collection pair every store call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Namespace {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Operations the crate needs from a document store driver.
pub trait DocumentStore: Send + Sync {
    /// Called once by `Client::open`.
    fn connect(&self, _config: &ClientConfig) -> Result<()> {
        Ok(())
    }

    /// Called once by `Client::shutdown` (or when the client is dropped).
    fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    /// Insert documents, returning how many were stored.
    fn insert_many(&self, ns: &Namespace, documents: Vec<Value>) -> Result<u64>;

    fn find(&self, ns: &Namespace, filter: &Value) -> Result<Vec<Value>>;

    fn find_one(&self, ns: &Namespace, filter: &Value) -> Result<Option<Value>> {
        Ok(self.find(ns, filter)?.into_iter().next())
    }

    /// Apply `update` (operator document) to the first match.
    /// Returns the document as it was before the update.
    fn find_one_and_update(&self, ns: &Namespace, filter: &Value, update: &Value) -> Result<Option<Value>>;

    /// Replace the first match. Returns the document as it was before.
    fn find_one_and_replace(&self, ns: &Namespace, filter: &Value, replacement: Value) -> Result<Option<Value>>;

    /// Delete every match, returning the number deleted.
    fn delete_many(&self, ns: &Namespace, filter: &Value) -> Result<u64>;

    fn aggregate(&self, ns: &Namespace, pipeline: &Pipeline) -> Result<Vec<Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_display() {
        let ns = Namespace::new("shop", "orders");
        assert_eq!(ns.to_string(), "shop.orders");
    }
}
