use tracing::debug;

use crate::commands::event_commands::normalize_pk;
use crate::{AppError, AppState};
use relay_domain::{ChannelName, ChannelSignRequest, ChannelSignResponse, ModelLabel};

/// Issues a subscription token for server-rendered pages that embed the
/// signed channel name.
pub async fn sign_channel(
    state: &AppState,
    payload: ChannelSignRequest,
) -> Result<ChannelSignResponse, AppError> {
    let channel = resolve_channel(state, payload)?;
    let signed_channel_name = state.signer.sign(&channel)?;
    debug!(channel = %channel, "issued channel token");
    Ok(ChannelSignResponse {
        channel_name: channel.to_string(),
        signed_channel_name,
    })
}

fn resolve_channel(state: &AppState, payload: ChannelSignRequest) -> Result<ChannelName, AppError> {
    if let Some(name) = normalize_optional_text(payload.channel_name) {
        if payload.model.is_some() || payload.pk.is_some() {
            return Err(AppError::BadRequest(
                "channel_name cannot be combined with model or pk".to_string(),
            ));
        }
        return Ok(ChannelName::parse(name)?);
    }

    let model = normalize_optional_text(payload.model)
        .ok_or_else(|| AppError::BadRequest("channel_name or model is required".to_string()))?;
    let label = ModelLabel::parse(&model)?;
    state.models.resolve(&label)?;
    match payload.pk {
        Some(pk) => Ok(ChannelName::for_instance(&label, &normalize_pk(&pk)?)?),
        None => Ok(ChannelName::for_model(&label)),
    }
}

fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
