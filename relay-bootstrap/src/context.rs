use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use relay_application::{AppState, ChannelSigner, GroupHub, Metrics};
use relay_infrastructure::{load_model_registry, AppConfig, FileTemplateRenderer, ModelFileRepository};

pub struct AppContext {
    pub state: AppState,
}

impl AppContext {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::load().await?;
        let runtime_config = config.to_runtime_config();

        let models =
            load_model_registry(&ModelFileRepository::new(), &runtime_config.models_path).await?;
        let signer = ChannelSigner::new(&runtime_config.signing_secret, &runtime_config.signing_salt)?;
        let renderer = FileTemplateRenderer::new(&runtime_config.template_dir);
        info!(
            models = models.len(),
            template_dir = %runtime_config.template_dir,
            missing_entity_policy = runtime_config.missing_entity_policy.as_str(),
            "relay context ready"
        );

        let state = AppState {
            config: runtime_config,
            hub: Arc::new(GroupHub::new()),
            signer: Arc::new(signer),
            models: Arc::new(models),
            renderer: Arc::new(renderer),
            metrics: Arc::new(Metrics::default()),
        };

        Ok(Self { state })
    }
}
