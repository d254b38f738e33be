use serde_json::Value;
use tracing::info;

use crate::{AppError, AppState};
use relay_domain::{ActionKind, ChannelName, DeliveryReport, EventPayload, ModelLabel, StreamEvent};

/// Validates every event before publishing any of them, so a bad batch
/// never half-applies.
pub async fn publish_events(
    state: &AppState,
    payloads: Vec<EventPayload>,
) -> Result<DeliveryReport, AppError> {
    if payloads.is_empty() {
        return Err(AppError::BadRequest("events must not be empty".to_string()));
    }

    let events = payloads
        .into_iter()
        .map(|payload| validate_event(state, payload))
        .collect::<Result<Vec<_>, _>>()?;

    let dispatcher = state.dispatcher();
    let mut report = DeliveryReport::default();
    let count = events.len();
    for event in events {
        report.merge(&dispatcher.publish(event).await);
    }
    info!(
        events = count,
        delivered = report.delivered,
        dropped = report.dropped,
        "published producer events"
    );
    Ok(report)
}

fn validate_event(state: &AppState, payload: EventPayload) -> Result<StreamEvent, AppError> {
    let channel_name = ChannelName::parse(payload.channel_name.trim())?;
    let model = ModelLabel::parse(&payload.model)?;
    state.models.resolve(&model)?;
    let pk = normalize_pk(&payload.pk)?;
    let action = payload.action.trim();
    if action.is_empty() {
        return Err(AppError::BadRequest("action must not be empty".to_string()));
    }

    let event = StreamEvent::new(channel_name, model, pk, ActionKind::new(action));
    Ok(match payload.snapshot {
        Some(snapshot) => event.with_snapshot(snapshot),
        None => event,
    })
}

/// Accepts string or integer primary keys and returns their canonical text.
pub fn normalize_pk(value: &Value) -> Result<String, AppError> {
    match value {
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Err(AppError::BadRequest("pk must not be empty".to_string()))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Value::Number(number) if number.is_i64() || number.is_u64() => Ok(number.to_string()),
        _ => Err(AppError::BadRequest(
            "pk must be a string or an integer".to_string(),
        )),
    }
}
