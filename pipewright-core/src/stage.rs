// pipewright-core/src/stage.rs
// Stage values, stage kinds and the serialized pipeline

use crate::payload::Payload;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::fmt;

/// Pipeline operator a stage runs as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// `$match`
    Filter,
    /// `$project`
    Project,
    /// `$group`
    Group,
    /// `$lookup`
    Join,
    /// `$sort`
    Sort,
    /// `$limit`
    Limit,
    /// `$skip`
    Skip,
    /// `$unwind`
    Unwind,
    /// `$bucket`
    Bucket,
    /// `$facet`
    Facet,
    /// `$count`
    Count,
    /// `$sortByCount`
    SortByCount,
    /// Any other operator, stored verbatim (e.g. `"$addFields"`)
    Custom(String),
}

impl StageKind {
    /// The operator tag emitted in the stage document.
    pub fn operator(&self) -> &str {
        match self {
            StageKind::Filter => "$match",
            StageKind::Project => "$project",
            StageKind::Group => "$group",
            StageKind::Join => "$lookup",
            StageKind::Sort => "$sort",
            StageKind::Limit => "$limit",
            StageKind::Skip => "$skip",
            StageKind::Unwind => "$unwind",
            StageKind::Bucket => "$bucket",
            StageKind::Facet => "$facet",
            StageKind::Count => "$count",
            StageKind::SortByCount => "$sortByCount",
            StageKind::Custom(op) => op,
        }
    }

    /// Resolve an operator tag, falling back to `Custom` for unknown ones.
    pub fn from_operator(op: &str) -> Self {
        match op {
            "$match" => StageKind::Filter,
            "$project" => StageKind::Project,
            "$group" => StageKind::Group,
            "$lookup" => StageKind::Join,
            "$sort" => StageKind::Sort,
            "$limit" => StageKind::Limit,
            "$skip" => StageKind::Skip,
            "$unwind" => StageKind::Unwind,
            "$bucket" => StageKind::Bucket,
            "$facet" => StageKind::Facet,
            "$count" => StageKind::Count,
            "$sortByCount" => StageKind::SortByCount,
            other => StageKind::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operator())
    }
}

impl From<&str> for StageKind {
    fn from(op: &str) -> Self {
        StageKind::from_operator(op)
    }
}

impl From<String> for StageKind {
    fn from(op: String) -> Self {
        StageKind::from_operator(&op)
    }
}

/// A named stage held by the registry.
///
/// `priority` is fixed at creation; appends only ever touch `payload`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    name: String,
    kind: StageKind,
    priority: u32,
    payload: Payload,
}

impl Stage {
    pub(crate) fn new(name: String, kind: StageKind, priority: u32, payload: Payload) -> Self {
        Stage {
            name,
            kind,
            priority,
            payload,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &StageKind {
        &self.kind
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub(crate) fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// Single-key `{operator: payload}` document for this stage.
    pub fn to_document(&self) -> StageDocument {
        StageDocument {
            kind: self.kind.clone(),
            payload: self.payload.clone(),
        }
    }
}

/// One element of a built pipeline: `{"$match": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDocument {
    kind: StageKind,
    payload: Payload,
}

impl StageDocument {
    pub fn kind(&self) -> &StageKind {
        &self.kind
    }

    pub fn operator(&self) -> &str {
        self.kind.operator()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn to_value(&self) -> Value {
        let mut doc = serde_json::Map::with_capacity(1);
        doc.insert(self.operator().to_string(), self.payload.to_value());
        Value::Object(doc)
    }
}

impl Serialize for StageDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_map(Some(1))?;
        doc.serialize_entry(self.operator(), &self.payload)?;
        doc.end()
    }
}

/// Ordered stage documents, ready for a store's aggregate call.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Pipeline {
    stages: Vec<StageDocument>,
}

impl Pipeline {
    pub(crate) fn from_stages(stages: Vec<StageDocument>) -> Self {
        Pipeline { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StageDocument> {
        self.stages.iter()
    }

    pub fn stages(&self) -> &[StageDocument] {
        &self.stages
    }

    /// Operator tags in pipeline order.
    pub fn operators(&self) -> Vec<&str> {
        self.stages.iter().map(StageDocument::operator).collect()
    }

    /// JSON array of stage documents, field order preserved.
    pub fn to_json(&self) -> Value {
        Value::Array(self.stages.iter().map(StageDocument::to_value).collect())
    }
}

impl<'a> IntoIterator for &'a Pipeline {
    type Item = &'a StageDocument;
    type IntoIter = std::slice::Iter<'a, StageDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}

impl IntoIterator for Pipeline {
    type Item = StageDocument;
    type IntoIter = std::vec::IntoIter<StageDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_round_trip_for_known_kinds() {
        let kinds = [
            StageKind::Filter,
            StageKind::Project,
            StageKind::Group,
            StageKind::Join,
            StageKind::Sort,
            StageKind::Limit,
            StageKind::Skip,
            StageKind::Unwind,
            StageKind::Bucket,
            StageKind::Facet,
            StageKind::Count,
            StageKind::SortByCount,
        ];
        for kind in kinds {
            assert_eq!(StageKind::from_operator(kind.operator()), kind);
        }
    }

    #[test]
    fn test_custom_kind_kept_verbatim() {
        let kind = StageKind::from("$addFields");
        assert_eq!(kind, StageKind::Custom("$addFields".to_string()));
        assert_eq!(kind.to_string(), "$addFields");
    }

    #[test]
    fn test_stage_document_is_single_key() {
        let stage = Stage::new(
            "c".to_string(),
            StageKind::Count,
            0,
            Payload::scalar("total"),
        );
        let doc = stage.to_document();
        assert_eq!(doc.to_value(), json!({"$count": "total"}));
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"$count": "total"}));
    }

    #[test]
    fn test_empty_pipeline_serializes_to_empty_array() {
        let pipeline = Pipeline::default();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.to_json(), json!([]));
        assert_eq!(serde_json::to_string(&pipeline).unwrap(), "[]");
    }
}
