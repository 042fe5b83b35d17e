// pipewright-core/src/builder.rs
// Fluent stage builder

use crate::error::{PipelineError, Result};
use crate::payload::{FieldMap, Payload};
use crate::registry::StageRegistry;
use crate::stage::{Pipeline, Stage, StageKind};
use crate::unwind_options::{UnwindOption, UnwindOptions};
use serde_json::Value;
use std::borrow::Borrow;

/// Collects named stages and emits them as an ordered [`Pipeline`].
///
/// Every method either creates a stage under a new name or merges into an
/// existing one, and returns the builder so calls chain with `?`:
///
/// ```
/// use pipewright_core::StageBuilder;
/// use serde_json::json;
///
/// let mut builder = StageBuilder::new();
/// builder
///     .filter("status_filter", json!({"status": "paid"}))?
///     .join("product_lookup", "product", "products", "ean", "products")?
///     .append_stage("status_filter", json!({"amount": {"$gt": 10}}))?;
///
/// let pipeline = builder.build();
/// assert_eq!(pipeline.operators(), vec!["$match", "$lookup"]);
/// # Ok::<(), pipewright_core::PipelineError>(())
/// ```
///
/// Stage order is creation order; appending never moves a stage.
#[derive(Debug, Clone, Default)]
pub struct StageBuilder {
    registry: StageRegistry,
}

impl StageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a stage of any kind.
    pub fn add_stage(
        &mut self,
        name: impl Into<String>,
        kind: impl Into<StageKind>,
        payload: impl Into<Payload>,
    ) -> Result<&mut Self> {
        self.registry.create(name, kind.into(), payload.into())?;
        Ok(self)
    }

    /// Merge more fields into a stage declared earlier.
    pub fn append_stage(&mut self, name: &str, payload: impl Into<Payload>) -> Result<&mut Self> {
        self.registry.append(name, payload.into())?;
        Ok(self)
    }

    /// `$match`
    pub fn filter(&mut self, name: impl Into<String>, filter: impl Into<Payload>) -> Result<&mut Self> {
        self.add_stage(name, StageKind::Filter, filter)
    }

    /// `$project`
    pub fn project(&mut self, name: impl Into<String>, projection: impl Into<Payload>) -> Result<&mut Self> {
        self.add_stage(name, StageKind::Project, projection)
    }

    /// `$group`
    pub fn group(&mut self, name: impl Into<String>, group: impl Into<Payload>) -> Result<&mut Self> {
        self.add_stage(name, StageKind::Group, group)
    }

    /// `$sort`. Keys are kept in the given order.
    ///
    /// ```
    /// # use pipewright_core::StageBuilder;
    /// let mut builder = StageBuilder::new();
    /// builder.sort("by_age", [("age", -1), ("name", 1)])?;
    /// assert_eq!(
    ///     serde_json::to_string(&builder.build())?,
    ///     r#"[{"$sort":{"age":-1,"name":1}}]"#
    /// );
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn sort<I, K, V>(&mut self, name: impl Into<String>, fields: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.add_stage(name, StageKind::Sort, Payload::ordered(fields))
    }

    /// `$limit`
    pub fn limit(&mut self, name: impl Into<String>, limit: u64) -> Result<&mut Self> {
        self.add_stage(name, StageKind::Limit, Payload::scalar(limit))
    }

    /// `$skip`
    pub fn skip(&mut self, name: impl Into<String>, skip: u64) -> Result<&mut Self> {
        self.add_stage(name, StageKind::Skip, Payload::scalar(skip))
    }

    /// `$lookup` joining `from` on `local_field == foreign_field`, output in `as_field`.
    pub fn join(
        &mut self,
        name: impl Into<String>,
        from: &str,
        local_field: &str,
        foreign_field: &str,
        as_field: &str,
    ) -> Result<&mut Self> {
        let lookup = Payload::ordered([
            ("from", from),
            ("localField", local_field),
            ("foreignField", foreign_field),
            ("as", as_field),
        ]);
        self.add_stage(name, StageKind::Join, lookup)
    }

    /// `$unwind` on `field_path`, configured by `options`.
    ///
    /// ```
    /// # use pipewright_core::StageBuilder;
    /// use pipewright_core::unwind_options::{include_index, preserve_null_empty};
    ///
    /// let mut builder = StageBuilder::new();
    /// builder.unwind("items", "$items", [include_index("idx"), preserve_null_empty(true)])?;
    /// # Ok::<(), pipewright_core::PipelineError>(())
    /// ```
    pub fn unwind<I>(&mut self, name: impl Into<String>, field_path: &str, options: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = UnwindOption>,
    {
        let opts = UnwindOptions::from_options(options);
        self.add_stage(name, StageKind::Unwind, opts.to_payload(field_path))
    }

    /// `$bucket`: split documents by `group_by` into `[boundaries[i], boundaries[i+1])`.
    ///
    /// At least two boundaries are required. `default` names the bucket for
    /// values outside the range; `output` holds accumulator fields.
    pub fn bucket(
        &mut self,
        name: impl Into<String>,
        group_by: impl Into<Value>,
        boundaries: Vec<Value>,
        default: Option<Value>,
        output: Option<FieldMap>,
    ) -> Result<&mut Self> {
        if boundaries.len() < 2 {
            return Err(PipelineError::MalformedArguments(format!(
                "$bucket needs at least two boundaries, got {}",
                boundaries.len()
            )));
        }

        let mut bucket = FieldMap::new();
        bucket.insert("groupBy".to_string(), group_by.into());
        bucket.insert("boundaries".to_string(), Value::Array(boundaries));
        if let Some(default) = default {
            bucket.insert("default".to_string(), default);
        }
        if let Some(output) = output {
            bucket.insert("output".to_string(), Value::Object(output));
        }
        self.add_stage(name, StageKind::Bucket, bucket)
    }

    /// `$facet`: each sub-builder is built and embedded under its output field.
    ///
    /// Output field names must be unique.
    pub fn facet<I, K, B>(&mut self, name: impl Into<String>, pipelines: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, B)>,
        K: Into<String>,
        B: Borrow<StageBuilder>,
    {
        let mut facet = FieldMap::new();
        for (output, builder) in pipelines {
            let output = output.into();
            if facet.contains_key(&output) {
                return Err(PipelineError::MalformedArguments(format!(
                    "$facet output field '{}' given twice",
                    output
                )));
            }
            facet.insert(output, builder.borrow().build().to_json());
        }
        self.add_stage(name, StageKind::Facet, facet)
    }

    /// `$count` into the field `field`.
    pub fn count(&mut self, name: impl Into<String>, field: &str) -> Result<&mut Self> {
        self.add_stage(name, StageKind::Count, Payload::scalar(field))
    }

    /// `$sortByCount` grouping on `expr`.
    pub fn sort_by_count(&mut self, name: impl Into<String>, expr: impl Into<Value>) -> Result<&mut Self> {
        self.add_stage(name, StageKind::SortByCount, Payload::Scalar(expr.into()))
    }

    /// Declared stages, in no particular order.
    pub fn stages(&self) -> Vec<&Stage> {
        self.registry.all()
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Ordered stage documents. Calling it again without changes gives the same result.
    pub fn build(&self) -> Pipeline {
        Pipeline::from_stages(
            self.registry
                .ordered_stages()
                .into_iter()
                .map(Stage::to_document)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unwind_options::{include_index, preserve_null_empty};
    use serde_json::json;

    #[test]
    fn test_add_stage_single() {
        let mut builder = StageBuilder::new();
        builder
            .add_stage("1", "$match", json!({"test": {"$eq": 1}}))
            .unwrap();

        assert_eq!(builder.stages().len(), 1);
        assert_eq!(
            builder.build().to_json(),
            json!([{"$match": {"test": {"$eq": 1}}}])
        );
    }

    #[test]
    fn test_count_scalar() {
        let mut builder = StageBuilder::new();
        builder.count("1", "test").unwrap();
        assert_eq!(builder.build().to_json(), json!([{"$count": "test"}]));
    }

    #[test]
    fn test_limit_and_skip() {
        let mut builder = StageBuilder::new();
        builder.skip("page", 20).unwrap().limit("size", 10).unwrap();
        assert_eq!(
            builder.build().to_json(),
            json!([{"$skip": 20}, {"$limit": 10}])
        );
    }

    #[test]
    fn test_join_is_ordered() {
        let mut builder = StageBuilder::new();
        builder
            .join("b", "otherCollection", "id", "fkId", "other")
            .unwrap();

        let pipeline = builder.build();
        assert_eq!(
            serde_json::to_string(&pipeline).unwrap(),
            r#"[{"$lookup":{"from":"otherCollection","localField":"id","foreignField":"fkId","as":"other"}}]"#
        );
    }

    #[test]
    fn test_unwind_with_options() {
        let mut builder = StageBuilder::new();
        builder
            .unwind("u", "$products", [include_index("position"), preserve_null_empty(true)])
            .unwrap();

        assert_eq!(
            builder.build().to_json(),
            json!([{"$unwind": {
                "path": "$products",
                "includeArrayIndex": "position",
                "preserveNullAndEmptyArrays": true
            }}])
        );
    }

    #[test]
    fn test_bucket_payload() {
        let mut builder = StageBuilder::new();
        let output = json!({"count": {"$sum": 1}}).as_object().cloned();
        builder
            .bucket(
                "price_ranges",
                "$price",
                vec![json!(0), json!(100), json!(200)],
                Some(json!("other")),
                output,
            )
            .unwrap();

        assert_eq!(
            builder.build().to_json(),
            json!([{"$bucket": {
                "groupBy": "$price",
                "boundaries": [0, 100, 200],
                "default": "other",
                "output": {"count": {"$sum": 1}}
            }}])
        );
    }

    #[test]
    fn test_bucket_needs_two_boundaries() {
        let mut builder = StageBuilder::new();
        let err = builder
            .bucket("b", "$price", vec![json!(0)], None, None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedArguments(_)));
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_sort_by_count() {
        let mut builder = StageBuilder::new();
        builder.sort_by_count("tags", "$tags").unwrap();
        assert_eq!(builder.build().to_json(), json!([{"$sortByCount": "$tags"}]));
    }

    #[test]
    fn test_facet_rejects_repeated_output() {
        let mut sub = StageBuilder::new();
        sub.count("n", "n").unwrap();

        let mut builder = StageBuilder::new();
        let err = builder
            .facet("f", [("same", &sub), ("same", &sub)])
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedArguments(_)));
        assert!(!builder.registry().contains("f"));
    }

    #[test]
    fn test_error_does_not_break_chain_state() {
        let mut builder = StageBuilder::new();
        builder.filter("a", json!({"x": 1})).unwrap();
        assert!(builder.filter("a", json!({"y": 1})).is_err());

        builder.limit("b", 1).unwrap();
        assert_eq!(builder.build().operators(), vec!["$match", "$limit"]);
    }
}
