// pipewright-core/src/registry.rs
// Name-keyed stage storage with creation-order priorities

use crate::error::{PipelineError, Result};
use crate::payload::{self, Payload};
use crate::stage::{Stage, StageKind};
use crate::{log_debug, log_trace, log_warn};
use std::collections::HashMap;

/// Owns every stage declared on a builder.
///
/// Names are unique. Each stage gets the next priority when created and keeps
/// it forever, so [`ordered_stages`](Self::ordered_stages) always returns
/// creation order. There is no removal.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    stages: HashMap<String, Stage>,
    next_priority: u32,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new stage under `name`.
    ///
    /// Fails with `DuplicateStageName` if the name is taken; the existing
    /// stage is left as it was. Repeated names in an ordered payload are
    /// collapsed before the stage is stored.
    pub fn create(&mut self, name: impl Into<String>, kind: StageKind, payload: Payload) -> Result<&Stage> {
        let name = name.into();
        if self.stages.contains_key(&name) {
            log_warn!("rejected duplicate stage '{}'", name);
            return Err(PipelineError::DuplicateStageName(name));
        }

        let priority = self.next_priority;
        self.next_priority = priority.checked_add(1).ok_or_else(|| {
            log_warn!("stage '{}' rejected: priorities exhausted", name);
            PipelineError::TooManyStages(priority)
        })?;
        let payload = payload.normalized();

        log_debug!("created stage '{}' ({}) at priority {}", name, kind, priority);
        log_trace!("stage '{}' payload: {}", name, payload.to_value());

        let stage = Stage::new(name.clone(), kind, priority, payload);
        Ok(self.stages.entry(name).or_insert(stage))
    }

    /// Merge `payload` into the stage called `name`.
    ///
    /// Nothing is modified when this fails.
    pub fn append(&mut self, name: &str, payload: Payload) -> Result<&Stage> {
        let stage = self
            .stages
            .get_mut(name)
            .ok_or_else(|| PipelineError::UnknownStageName(name.to_string()))?;

        let merged = payload::merge(stage.payload(), payload).map_err(|err| {
            log_warn!("append to stage '{}' rejected: {}", name, err);
            err
        })?;

        log_debug!("merged fields into stage '{}'", name);
        log_trace!("stage '{}' payload: {}", name, merged.to_value());

        stage.set_payload(merged);
        Ok(stage)
    }

    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Stages in ascending priority.
    pub fn ordered_stages(&self) -> Vec<&Stage> {
        let mut stages: Vec<&Stage> = self.stages.values().collect();
        stages.sort_by_key(|stage| stage.priority());
        stages
    }

    /// Stages in no particular order.
    pub fn all(&self) -> Vec<&Stage> {
        self.stages.values().collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
