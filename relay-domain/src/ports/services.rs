use async_trait::async_trait;

use crate::entities::StreamFragment;

/// Templating collaborator that turns a fragment context into markup.
#[async_trait]
pub trait FragmentRenderer: Send + Sync {
    async fn render(&self, fragment: &StreamFragment) -> anyhow::Result<String>;
}
