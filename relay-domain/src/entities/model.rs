// Model metadata and render context

use serde::{Deserialize, Serialize};

use crate::value_objects::{ActionKind, ModelLabel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub label: ModelLabel,
    pub verbose_name: String,
    pub verbose_name_plural: String,
}

impl ModelMeta {
    /// Verbose names default to the model name and its naive plural.
    pub fn new(label: ModelLabel) -> Self {
        let verbose_name = label.model_name().to_string();
        let verbose_name_plural = format!("{}s", verbose_name);
        Self {
            label,
            verbose_name,
            verbose_name_plural,
        }
    }

    pub fn with_verbose_names(
        mut self,
        verbose_name: Option<String>,
        verbose_name_plural: Option<String>,
    ) -> Self {
        if let Some(name) = verbose_name.filter(|value| !value.trim().is_empty()) {
            self.verbose_name_plural = format!("{}s", name.trim());
            self.verbose_name = name.trim().to_string();
        }
        if let Some(plural) = verbose_name_plural.filter(|value| !value.trim().is_empty()) {
            self.verbose_name_plural = plural.trim().to_string();
        }
        self
    }

    /// Per-model template path, relative to the template directory.
    pub fn template_path(&self) -> String {
        format!("{}/{}.html", self.label.app_label(), self.label.model_name())
    }
}

/// One entry of the model manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelManifestEntry {
    pub label: String,
    #[serde(default)]
    pub verbose_name: Option<String>,
    #[serde(default)]
    pub verbose_name_plural: Option<String>,
    /// JSON array of records, each carrying a `pk` field.
    #[serde(default)]
    pub fixtures: Option<String>,
}

/// Everything a renderer needs to produce one fragment.
#[derive(Debug, Clone, Serialize)]
pub struct StreamFragment {
    pub model: ModelMeta,
    pub action: ActionKind,
    pub dom_target: String,
    pub model_template: String,
    pub object: serde_json::Value,
}
