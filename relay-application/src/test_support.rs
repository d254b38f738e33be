use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use relay_domain::{
    ChannelName, EntityStore, FragmentRenderer, ModelLabel, ModelMeta, RuntimeConfig,
    StreamFragment,
};

use crate::{AppState, ChannelSigner, GroupHub, Metrics, ModelRegistry};

pub const SECRET: &str = "test-secret";

#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub async fn put(&self, pk: &str, value: Value) {
        self.rows.write().await.insert(pk.to_string(), value);
    }

    pub async fn delete(&self, pk: &str) {
        self.rows.write().await.remove(pk);
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn fetch(&self, pk: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.rows.read().await.get(pk).cloned())
    }
}

/// Renders `<action>|<dom_target>|<title>` so tests can assert on each part.
pub struct PipeRenderer;

#[async_trait]
impl FragmentRenderer for PipeRenderer {
    async fn render(&self, fragment: &StreamFragment) -> anyhow::Result<String> {
        let title = fragment
            .object
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("");
        Ok(format!(
            "{}|{}|{}",
            fragment.action, fragment.dom_target, title
        ))
    }
}

pub struct Fixture {
    pub state: AppState,
    pub posts: Arc<MemoryStore>,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(RuntimeConfig::default()).await
    }

    pub async fn with_config(mut config: RuntimeConfig) -> Self {
        config.signing_secret = SECRET.to_string();
        let posts = Arc::new(MemoryStore::default());
        posts.put("1", json!({"pk": 1, "title": "Hello"})).await;
        posts.put("2", json!({"pk": 2, "title": "World"})).await;

        let mut models = ModelRegistry::new();
        models.register(
            ModelMeta::new(post_label())
                .with_verbose_names(Some("Post".into()), Some("Posts".into())),
            posts.clone(),
        );

        let signer = ChannelSigner::new(&config.signing_secret, &config.signing_salt)
            .expect("signer");
        let state = AppState {
            config,
            hub: Arc::new(GroupHub::new()),
            signer: Arc::new(signer),
            models: Arc::new(models),
            renderer: Arc::new(PipeRenderer),
            metrics: Arc::new(Metrics::default()),
        };
        Self { state, posts }
    }

    pub fn token(&self, channel_name: &str) -> String {
        self.state
            .signer
            .sign(&channel(channel_name))
            .expect("sign channel")
    }
}

pub fn post_label() -> ModelLabel {
    ModelLabel::parse("blog.post").expect("label")
}

pub fn channel(name: &str) -> ChannelName {
    ChannelName::parse(name).expect("channel")
}
