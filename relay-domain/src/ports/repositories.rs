use async_trait::async_trait;

use crate::entities::ModelManifestEntry;

/// Typed fetch capability for one model: looks up a live instance by primary
/// key and returns its serialized fields.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn fetch(&self, pk: &str) -> anyhow::Result<Option<serde_json::Value>>;
}

#[async_trait]
pub trait ModelRepository: Send + Sync {
    async fn load_manifest(&self, path: &str) -> anyhow::Result<Vec<ModelManifestEntry>>;
    async fn load_fixtures(&self, path: &str) -> anyhow::Result<Vec<serde_json::Value>>;
}
