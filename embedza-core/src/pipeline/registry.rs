//! Ordered collection of stages.

use std::sync::Arc;

use crate::error::EmbedError;
use crate::pipeline::stage::Stage;
use crate::pipeline::stages::{
    ConvertStrIntStage, ImageSizeStage, MergeStage, MimeDetectStage, ResolveHrefStage,
    SetAutoplayStage, SslForceStage,
};

/// Stages kept sorted by ascending priority; equal priorities keep
/// registration order.
#[derive(Clone, Default)]
pub struct StageRegistry {
    stages: Vec<Arc<dyn Stage>>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in stage, in run order.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.add(Arc::new(ResolveHrefStage));
        registry.add(Arc::new(MimeDetectStage));
        registry.add(Arc::new(SslForceStage));
        registry.add(Arc::new(MergeStage));
        registry.add(Arc::new(ImageSizeStage));
        registry.add(Arc::new(SetAutoplayStage));
        registry.add(Arc::new(ConvertStrIntStage));
        registry
    }

    /// Register a stage.
    pub fn add(&mut self, stage: Arc<dyn Stage>) {
        self.stages.push(stage);
        // Stable sort: ties stay in insertion order.
        self.stages.sort_by_key(|s| s.metadata().priority);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Stage>> {
        self.stages.iter().find(|s| s.metadata().id == id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.metadata().id).collect()
    }

    /// Stages in run order.
    pub fn ordered(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// A registry holding only the named stages, still in run order.
    pub fn select(&self, ids: &[&str]) -> Result<StageRegistry, EmbedError> {
        if let Some(unknown) = ids.iter().find(|id| self.get(id).is_none()) {
            return Err(EmbedError::UnknownStage(unknown.to_string()));
        }

        Ok(StageRegistry {
            stages: self
                .stages
                .iter()
                .filter(|s| ids.contains(&s.metadata().id))
                .cloned()
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
