// pipewright-core/src/payload.rs
// Stage payloads and the structural merge applied by `append`

use crate::error::{PipelineError, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Field-name → expression pairs where order carries no meaning.
pub type FieldMap = Map<String, Value>;

/// Field-name → expression pairs where order matters (sort keys, join specs).
pub type FieldList = Vec<(String, Value)>;

/// Parameter data of a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Unordered fields, unique names
    Fields(FieldMap),
    /// Ordered fields
    Ordered(FieldList),
    /// A single expression, e.g. the output field of `$count`
    Scalar(Value),
}

/// Shape tag of a [`Payload`], used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Fields,
    Ordered,
    Scalar,
}

impl fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadShape::Fields => "field map",
            PayloadShape::Ordered => "ordered field list",
            PayloadShape::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

impl Payload {
    /// Build an ordered field list from `(name, expression)` pairs.
    ///
    /// A repeated name keeps its first position and takes the last value.
    pub fn ordered<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Payload::Ordered(dedup_ordered(
            fields.into_iter().map(|(k, v)| (k.into(), v.into())),
        ))
    }

    /// Collapse repeated names of an ordered list, as [`Payload::ordered`] does.
    /// Other shapes are returned unchanged.
    pub fn normalized(self) -> Self {
        match self {
            Payload::Ordered(list) => Payload::Ordered(dedup_ordered(list)),
            other => other,
        }
    }

    pub fn scalar(value: impl Into<Value>) -> Self {
        Payload::Scalar(value.into())
    }

    pub fn shape(&self) -> PayloadShape {
        match self {
            Payload::Fields(_) => PayloadShape::Fields,
            Payload::Ordered(_) => PayloadShape::Ordered,
            Payload::Scalar(_) => PayloadShape::Scalar,
        }
    }

    /// Look up a top-level field. Always `None` for scalars.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Payload::Fields(map) => map.get(field),
            Payload::Ordered(list) => list.iter().find(|(k, _)| k == field).map(|(_, v)| v),
            Payload::Scalar(_) => None,
        }
    }

    /// Render as a JSON value. Ordered lists keep their order.
    pub fn to_value(&self) -> Value {
        match self {
            Payload::Fields(map) => Value::Object(map.clone()),
            Payload::Ordered(list) => Value::Object(list.iter().cloned().collect()),
            Payload::Scalar(value) => value.clone(),
        }
    }
}

impl From<FieldMap> for Payload {
    fn from(map: FieldMap) -> Self {
        Payload::Fields(map)
    }
}

impl From<FieldList> for Payload {
    fn from(list: FieldList) -> Self {
        Payload::Ordered(dedup_ordered(list))
    }
}

/// JSON objects become field maps, everything else a scalar.
impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Payload::Fields(map),
            other => Payload::Scalar(other),
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Scalar(Value::from(value))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Scalar(Value::from(value))
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Payload::Fields(map) => map.serialize(serializer),
            Payload::Ordered(list) => {
                let mut out = serializer.serialize_map(Some(list.len()))?;
                for (key, value) in list {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Payload::Scalar(value) => value.serialize(serializer),
        }
    }
}

/// Merge `incoming` on top of `existing`, last write wins per field.
///
/// - field map + field map: keys of `incoming` are inserted or overwritten.
/// - ordered + ordered: colliding keys keep their existing position and take
///   the incoming value; new keys are appended in incoming order.
/// - field map + ordered (either way): `IncompatiblePayloadShapes`.
/// - a scalar on either side: `UnmergeablePayload`.
pub fn merge(existing: &Payload, incoming: Payload) -> Result<Payload> {
    match (existing, incoming) {
        (Payload::Fields(current), Payload::Fields(update)) => {
            Ok(Payload::Fields(merge_fields(current.clone(), update)))
        }
        (Payload::Ordered(current), Payload::Ordered(update)) => {
            Ok(Payload::Ordered(merge_ordered(current.clone(), update)))
        }
        (Payload::Scalar(_), incoming) | (_, incoming @ Payload::Scalar(_)) => {
            Err(PipelineError::UnmergeablePayload {
                existing: existing.shape(),
                incoming: incoming.shape(),
            })
        }
        (_, incoming) => Err(PipelineError::IncompatiblePayloadShapes {
            existing: existing.shape(),
            incoming: incoming.shape(),
        }),
    }
}

fn merge_fields(mut current: FieldMap, update: FieldMap) -> FieldMap {
    for (key, value) in update {
        current.insert(key, value);
    }
    current
}

fn dedup_ordered(fields: impl IntoIterator<Item = (String, Value)>) -> FieldList {
    merge_ordered(FieldList::new(), fields)
}

fn merge_ordered(mut current: FieldList, update: impl IntoIterator<Item = (String, Value)>) -> FieldList {
    for (key, value) in update {
        match current.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => current.push((key, value)),
        }
    }
    current
}
