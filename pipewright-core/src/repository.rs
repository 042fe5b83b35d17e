// pipewright-core/src/repository.rs
// Typed CRUD + aggregate over one collection

use crate::client::Database;
use crate::error::{PipelineError, Result};
use crate::payload::FieldMap;
use crate::record::Record;
use crate::stage::Pipeline;
use crate::store::{DocumentStore, Namespace};
use crate::{log_debug, log_trace};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::marker::PhantomData;

/// Second argument of [`Repository::update_one`].
#[derive(Debug, Clone)]
pub enum Update<T> {
    /// A whole record, sent as `{"$set": record}` after `on_update` runs
    Record(T),
    /// Raw update operators; `$currentDate: {updatedAt: true}` is added
    Operators(FieldMap),
}

/// Record-typed access to one collection.
///
/// Lifecycle hooks run here: `on_create` before inserts, `on_update` and
/// `on_replace` before the corresponding writes.
pub struct Repository<T: Record, S: DocumentStore> {
    db: Database<S>,
    ns: Namespace,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record, S: DocumentStore> Repository<T, S> {
    pub fn new(db: &Database<S>, collection: &str) -> Self {
        Repository {
            db: db.clone(),
            ns: db.namespace(collection),
            _record: PhantomData,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    pub fn insert_one(&self, record: &mut T) -> Result<()> {
        record.on_create();
        let doc = serde_json::to_value(&*record)?;
        log_debug!("insert_one into {}", self.ns);
        log_trace!("document: {}", doc);
        self.db.with_store(|store| store.insert_many(&self.ns, vec![doc]))?;
        Ok(())
    }

    /// Insert all records. Only records without an id get `on_create`.
    pub fn insert_many(&self, records: &mut [T]) -> Result<u64> {
        let mut docs = Vec::with_capacity(records.len());
        for record in records.iter_mut() {
            if record.id().is_none() {
                record.on_create();
            }
            docs.push(serde_json::to_value(&*record)?);
        }
        log_debug!("insert_many into {}: {} documents", self.ns, docs.len());
        self.db.with_store(|store| store.insert_many(&self.ns, docs))
    }

    pub fn find_one(&self, filter: &Value) -> Result<Option<T>> {
        log_debug!("find_one on {}", self.ns);
        self.db
            .with_store(|store| store.find_one(&self.ns, filter))?
            .map(decode)
            .transpose()
    }

    pub fn find(&self, filter: &Value) -> Result<Vec<T>> {
        log_debug!("find on {}", self.ns);
        self.db
            .with_store(|store| store.find(&self.ns, filter))?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Update the first match and return it as it was before the update.
    ///
    /// Fails with `DocumentNotFound` if nothing matched and with
    /// `InvalidUpdate` if an operator key does not start with `$`.
    pub fn update_one(&self, filter: &Value, update: Update<T>) -> Result<T> {
        let update = match update {
            Update::Record(mut record) => {
                record.on_update();
                let fields = serde_json::to_value(&record)?;
                json!({ "$set": fields })
            }
            Update::Operators(ops) => Value::Object(stamp_updated_at(ops)?),
        };

        log_debug!("update_one on {}", self.ns);
        log_trace!("update: {}", update);
        let before = self
            .db
            .with_store(|store| store.find_one_and_update(&self.ns, filter, &update))?
            .ok_or(PipelineError::DocumentNotFound)?;
        decode(before)
    }

    /// Delete every match, returning the count.
    pub fn delete(&self, filter: &Value) -> Result<u64> {
        log_debug!("delete on {}", self.ns);
        self.db.with_store(|store| store.delete_many(&self.ns, filter))
    }

    /// Replace the first match. The replacement's id is cleared by
    /// `on_replace` so the stored `_id` is kept.
    pub fn replace_one(&self, filter: &Value, mut replacement: T) -> Result<()> {
        replacement.on_replace();
        let doc = serde_json::to_value(&replacement)?;
        log_debug!("replace_one on {}", self.ns);
        self.db
            .with_store(|store| store.find_one_and_replace(&self.ns, filter, doc))?
            .ok_or(PipelineError::DocumentNotFound)?;
        Ok(())
    }

    /// Run a pipeline on this collection, decoding results into `R`.
    pub fn aggregate<R: DeserializeOwned>(&self, pipeline: &Pipeline) -> Result<Vec<R>> {
        self.db.aggregate_as(&self.ns.collection, pipeline)
    }
}

fn decode<T: DeserializeOwned>(doc: Value) -> Result<T> {
    Ok(serde_json::from_value(doc)?)
}

/// Validate operator keys and add `$currentDate: {updatedAt: true}`, keeping
/// any other `$currentDate` fields the caller set.
fn stamp_updated_at(mut ops: FieldMap) -> Result<FieldMap> {
    if let Some(key) = ops.keys().find(|k| !k.starts_with('$')) {
        return Err(PipelineError::InvalidUpdate(format!(
            "'{}' is not an update operator",
            key
        )));
    }

    match ops.get_mut("$currentDate") {
        Some(Value::Object(current)) => {
            current.insert("updatedAt".to_string(), Value::Bool(true));
        }
        Some(other) => {
            return Err(PipelineError::InvalidUpdate(format!(
                "$currentDate must be a document, got {}",
                other
            )))
        }
        None => {
            ops.insert("$currentDate".to_string(), json!({ "updatedAt": true }));
        }
    }
    Ok(ops)
}
