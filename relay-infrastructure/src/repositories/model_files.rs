use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};

use relay_application::ModelRegistry;
use relay_domain::{EntityStore, ModelLabel, ModelManifestEntry, ModelMeta, ModelRepository};

/// Reads the YAML model manifest and JSON fixture files.
#[derive(Default)]
pub struct ModelFileRepository;

impl ModelFileRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelRepository for ModelFileRepository {
    async fn load_manifest(&self, path: &str) -> Result<Vec<ModelManifestEntry>> {
        if !Path::new(path).exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path).await?;
        let entries: Vec<ModelManifestEntry> = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid model manifest {}", path))?;
        Ok(entries)
    }

    async fn load_fixtures(&self, path: &str) -> Result<Vec<Value>> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read fixtures {}", path))?;
        let records: Vec<Value> = serde_json::from_str(&content)
            .with_context(|| format!("fixtures {} must be a JSON array", path))?;
        Ok(records)
    }
}

/// Entity store backed by an in-process table keyed by primary key.
#[derive(Default)]
pub struct FixtureEntityTable {
    rows: RwLock<HashMap<String, Value>>,
}

impl FixtureEntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record must be an object with a string or integer `pk`.
    pub fn from_records(records: Vec<Value>) -> Result<Self> {
        let mut rows = HashMap::with_capacity(records.len());
        for record in records {
            let pk = record_pk(&record)?;
            rows.insert(pk, record);
        }
        Ok(Self {
            rows: RwLock::new(rows),
        })
    }

    pub async fn upsert(&self, record: Value) -> Result<String> {
        let pk = record_pk(&record)?;
        self.rows.write().await.insert(pk.clone(), record);
        Ok(pk)
    }

    pub async fn remove(&self, pk: &str) -> Option<Value> {
        self.rows.write().await.remove(pk)
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl EntityStore for FixtureEntityTable {
    async fn fetch(&self, pk: &str) -> Result<Option<Value>> {
        Ok(self.rows.read().await.get(pk.trim()).cloned())
    }
}

fn record_pk(record: &Value) -> Result<String> {
    match record.get("pk") {
        Some(Value::String(pk)) if !pk.trim().is_empty() => Ok(pk.trim().to_string()),
        Some(Value::Number(pk)) if pk.is_i64() || pk.is_u64() => Ok(pk.to_string()),
        _ => Err(anyhow!("fixture record is missing a string or integer pk")),
    }
}

/// Builds the registry from the manifest at `models_path`. Fixture paths are
/// resolved relative to the manifest. A missing manifest yields an empty
/// registry, which keeps the service alive but not ready.
pub async fn load_model_registry(
    repo: &dyn ModelRepository,
    models_path: &str,
) -> Result<ModelRegistry> {
    let entries = repo.load_manifest(models_path).await?;
    if entries.is_empty() {
        warn!(path = %models_path, "no models registered");
    }
    let base_dir = Path::new(models_path).parent();

    let mut registry = ModelRegistry::new();
    for entry in entries {
        let label = ModelLabel::parse(&entry.label)?;
        let table = match entry.fixtures.as_deref() {
            Some(fixtures) => {
                let path = match base_dir {
                    Some(base) => base.join(fixtures).to_string_lossy().to_string(),
                    None => fixtures.to_string(),
                };
                FixtureEntityTable::from_records(repo.load_fixtures(&path).await?)
                    .with_context(|| format!("fixtures for {}", label))?
            }
            None => FixtureEntityTable::new(),
        };
        info!(model = %label, rows = table.len().await, "model registered");
        let meta = ModelMeta::new(label)
            .with_verbose_names(entry.verbose_name, entry.verbose_name_plural);
        registry.register(meta, Arc::new(table));
    }
    Ok(registry)
}
