// Model label value object

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const MAX_LABEL_LEN: usize = 64;

/// `<app_label>.<model_name>`, normalized to lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelLabel {
    app_label: String,
    model_name: String,
}

impl ModelLabel {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.len() > MAX_LABEL_LEN {
            return Err(DomainError::InvalidModelLabel(raw.to_string()));
        }
        let Some((app_label, model_name)) = normalized.split_once('.') else {
            return Err(DomainError::InvalidModelLabel(raw.to_string()));
        };
        if !is_identifier(app_label) || !is_identifier(model_name) {
            return Err(DomainError::InvalidModelLabel(raw.to_string()));
        }
        Ok(Self {
            app_label: app_label.to_string(),
            model_name: model_name.to_string(),
        })
    }

    pub fn app_label(&self) -> &str {
        &self.app_label
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
}

impl TryFrom<String> for ModelLabel {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModelLabel> for String {
    fn from(value: ModelLabel) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ModelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model_name)
    }
}
