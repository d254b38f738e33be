use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::RwLock;

use relay_domain::{ActionKind, FragmentRenderer, StreamFragment};

use crate::utils::escape_html;

/// Renders `<turbo-stream>` fragments from per-model HTML templates under
/// `template_dir`. Templates are read once and cached for the process
/// lifetime.
///
/// Placeholders are `{{ name }}`. `object.<field>` (or a bare field name)
/// reads the entity, dotted paths walk nested objects, and `dom_target`,
/// `action`, `model_name` and `model_label` expose the fragment context.
/// Unknown names render empty. Every value is HTML-escaped.
pub struct FileTemplateRenderer {
    template_dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<String>>>,
}

impl FileTemplateRenderer {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn template(&self, relative: &str) -> Result<Arc<String>> {
        if let Some(template) = self.cache.read().await.get(relative) {
            return Ok(template.clone());
        }
        let path = self.template_dir.join(relative);
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("template not found: {}", path.display()))?;
        let template = Arc::new(content);
        self.cache
            .write()
            .await
            .insert(relative.to_string(), template.clone());
        Ok(template)
    }
}

#[async_trait]
impl FragmentRenderer for FileTemplateRenderer {
    async fn render(&self, fragment: &StreamFragment) -> Result<String> {
        // Removal has no template body.
        let body = if fragment.action.as_str() == ActionKind::REMOVE {
            String::new()
        } else {
            let template = self.template(&fragment.model_template).await?;
            format!(
                "<template>{}</template>",
                substitute(&template, |name| lookup(fragment, name))
            )
        };
        Ok(format!(
            "<turbo-stream action=\"{}\" target=\"{}\">{}</turbo-stream>",
            escape_html(fragment.action.as_str()),
            escape_html(&fragment.dom_target),
            body
        ))
    }
}

fn lookup(fragment: &StreamFragment, name: &str) -> String {
    match name {
        "dom_target" => return fragment.dom_target.clone(),
        "action" => return fragment.action.to_string(),
        "model_name" => return fragment.model.verbose_name.clone(),
        "model_label" => return fragment.model.label.to_string(),
        _ => {}
    }
    let path = name.strip_prefix("object.").unwrap_or(name);
    let mut current = &fragment.object;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return String::new(),
        }
    }
    value_text(current)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Replaces each `{{ name }}` with the escaped lookup result. An unterminated
/// `{{` is kept verbatim.
fn substitute(template: &str, resolve: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        out.push_str(&escape_html(&resolve(after[..end].trim())));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}
