use std::sync::Arc;

use relay_domain::{FragmentRenderer, RuntimeConfig};

use crate::{ChannelSigner, EventDispatcher, GroupHub, Metrics, ModelRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub hub: Arc<GroupHub>,
    pub signer: Arc<ChannelSigner>,
    pub models: Arc<ModelRegistry>,
    pub renderer: Arc<dyn FragmentRenderer>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn dispatcher(&self) -> EventDispatcher {
        EventDispatcher::new(self.hub.clone(), self.metrics.clone())
    }
}
