use std::collections::HashMap;
use std::sync::Arc;

use relay_domain::{EntityStore, ModelLabel, ModelMeta};

use crate::AppError;

pub struct RegisteredModel {
    pub meta: ModelMeta,
    pub store: Arc<dyn EntityStore>,
}

/// Maps model labels to their metadata and fetch capability. Built once at
/// startup and shared read-only afterwards.
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<ModelLabel, RegisteredModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering a label twice replaces the earlier entry.
    pub fn register(&mut self, meta: ModelMeta, store: Arc<dyn EntityStore>) {
        self.models
            .insert(meta.label.clone(), RegisteredModel { meta, store });
    }

    pub fn get(&self, label: &ModelLabel) -> Option<&RegisteredModel> {
        self.models.get(label)
    }

    pub fn resolve(&self, label: &ModelLabel) -> Result<&RegisteredModel, AppError> {
        self.get(label)
            .ok_or_else(|| AppError::UnknownModel(label.to_string()))
    }

    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.models.keys().map(ToString::to_string).collect();
        labels.sort();
        labels
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
