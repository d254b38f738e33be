// Wire messages exchanged with WebSocket clients

use serde::{Deserialize, Serialize};

use crate::value_objects::RequestId;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        request_id: RequestId,
        #[serde(default)]
        signed_channel_name: String,
    },
    Unsubscribe {
        request_id: RequestId,
    },
}

impl ClientMessage {
    pub fn request_id(&self) -> &RequestId {
        match self {
            ClientMessage::Subscribe { request_id, .. } => request_id,
            ClientMessage::Unsubscribe { request_id } => request_id,
        }
    }
}

/// Rendered fragment addressed to the element that subscribed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub request_id: RequestId,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidSignature,
    BadMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorFrame {
    pub request_id: Option<RequestId>,
    pub error: ErrorCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Payload(OutboundFrame),
    Error(ErrorFrame),
}

impl From<OutboundFrame> for ServerFrame {
    fn from(value: OutboundFrame) -> Self {
        ServerFrame::Payload(value)
    }
}

impl From<ErrorFrame> for ServerFrame {
    fn from(value: ErrorFrame) -> Self {
        ServerFrame::Error(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_subscribe_and_unsubscribe() {
        let subscribe: ClientMessage = serde_json::from_value(json!({
            "type": "subscribe",
            "request_id": "r-1",
            "signed_channel_name": "blog.post:abc"
        }))
        .expect("subscribe");
        assert_eq!(
            subscribe,
            ClientMessage::Subscribe {
                request_id: RequestId::new("r-1"),
                signed_channel_name: "blog.post:abc".to_string(),
            }
        );

        let unsubscribe: ClientMessage =
            serde_json::from_value(json!({"type": "unsubscribe", "request_id": "r-1"}))
                .expect("unsubscribe");
        assert_eq!(unsubscribe.request_id().as_str(), "r-1");
    }

    #[test]
    fn subscribe_without_token_defaults_to_empty() {
        let message: ClientMessage =
            serde_json::from_value(json!({"type": "subscribe", "request_id": "r-2"}))
                .expect("subscribe");
        match message {
            ClientMessage::Subscribe {
                signed_channel_name,
                ..
            } => assert!(signed_channel_name.is_empty()),
            _ => panic!("unexpected message"),
        }
    }

    #[test]
    fn server_frames_serialize_flat() {
        let payload = ServerFrame::from(OutboundFrame {
            request_id: RequestId::new("r-1"),
            data: "<p>hi</p>".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&payload).expect("payload"),
            json!({"request_id": "r-1", "data": "<p>hi</p>"})
        );

        let error = ServerFrame::from(ErrorFrame {
            request_id: None,
            error: ErrorCode::BadMessage,
        });
        assert_eq!(
            serde_json::to_value(&error).expect("error"),
            json!({"request_id": null, "error": "bad_message"})
        );
    }
}
