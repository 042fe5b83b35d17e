// pipewright-core/src/record.rs
// Record identity, timestamps and lifecycle capabilities

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Record identifier, stored as a plain string under `_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Fresh random id (UUID v4).
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId(id.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bookkeeping fields a record carries, meant to be `#[serde(flatten)]`ed
/// into the record type.
///
/// Unset fields are not serialized, so a cleared id lets the store keep the
/// existing `_id` on update and replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    /// Meta with a fresh id and both timestamps set to now.
    pub fn new() -> Self {
        let now = Utc::now();
        RecordMeta {
            id: Some(RecordId::generate()),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Assign an id if missing; stamp created and updated.
    pub fn initialize(&mut self) {
        if self.id.is_none() {
            self.id = Some(RecordId::generate());
        }
        let now = Utc::now();
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    /// Drop the id and stamp updated.
    pub fn touch_for_write(&mut self) {
        self.id = None;
        self.updated_at = Some(Utc::now());
    }
}

/// Access to a record's [`RecordMeta`].
pub trait HasMeta {
    fn meta(&self) -> &RecordMeta;
    fn meta_mut(&mut self) -> &mut RecordMeta;

    fn id(&self) -> Option<&RecordId> {
        self.meta().id.as_ref()
    }
}

/// Hook run before a record is inserted.
pub trait Initializable: HasMeta {
    fn on_create(&mut self) {
        self.meta_mut().initialize();
    }
}

/// Hook run before a record is used as an update.
pub trait Updatable: HasMeta {
    fn on_update(&mut self) {
        self.meta_mut().touch_for_write();
    }
}

/// Hook run before a record replaces a stored one.
pub trait Replaceable: HasMeta {
    fn on_replace(&mut self) {
        self.meta_mut().touch_for_write();
    }
}

/// Everything a [`Repository`](crate::Repository) needs from a record type.
///
/// Implemented automatically; a record type opts in by implementing
/// [`HasMeta`] and the three hook traits (usually with empty `impl` blocks).
pub trait Record: Initializable + Updatable + Replaceable + Serialize + DeserializeOwned {}

impl<T> Record for T where T: Initializable + Updatable + Replaceable + Serialize + DeserializeOwned {}
