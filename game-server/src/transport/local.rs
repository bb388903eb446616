//! The in-process transport: a map from connectionId to the sender half
//! of the channel feeding that socket's write task. This is the
//! single-process stand-in for an opaque endpoint learned at connect time
//! (the real-world analogue being an API-Gateway management endpoint) —
//! the `Transport` trait boundary is where that swap would happen without
//! touching admission/dispatch/disconnect.

use axum::extract::ws::{Message, Utf8Bytes};
use dashmap::DashMap;
use tokio::sync::mpsc;

use protocol::OutboundFrame;

use super::{PostError, Transport};

pub struct LocalTransport {
    senders: DashMap<String, mpsc::UnboundedSender<Message>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        LocalTransport {
            senders: DashMap::new(),
        }
    }

    /// Called by the WS upgrade handler once a socket is accepted.
    pub fn attach(&self, connection_id: &str, sender: mpsc::UnboundedSender<Message>) {
        self.senders.insert(connection_id.to_string(), sender);
    }

    /// Called when a socket's tasks exit, regardless of why.
    pub fn detach(&self, connection_id: &str) {
        self.senders.remove(connection_id);
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for LocalTransport {
    async fn post(&self, connection_id: &str, payload: &OutboundFrame) -> Result<(), PostError> {
        let Some(sender) = self.senders.get(connection_id) else {
            return Err(PostError::Gone);
        };

        let json = serde_json::to_string(payload).map_err(|_| PostError::Transient)?;
        sender
            .send(Message::Text(Utf8Bytes::from(json)))
            .map_err(|_| PostError::Gone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn post_to_missing_connection_is_gone() {
        let transport = LocalTransport::new();
        let err = transport
            .post("nope", &OutboundFrame::Error { message: "x".into(), code: None })
            .await
            .unwrap_err();
        assert_eq!(err, PostError::Gone);
    }

    #[tokio::test]
    async fn post_to_closed_receiver_is_gone() {
        let transport = LocalTransport::new();
        let (tx, rx) = mpsc::unbounded_channel();
        transport.attach("c1", tx);
        drop(rx);
        let err = transport
            .post("c1", &OutboundFrame::Error { message: "x".into(), code: None })
            .await
            .unwrap_err();
        assert_eq!(err, PostError::Gone);
    }

    #[tokio::test]
    async fn post_delivers_serialized_frame() {
        let transport = LocalTransport::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.attach("c1", tx);
        transport
            .post(
                "c1",
                &OutboundFrame::Chat {
                    game_id: "g1".into(),
                    player: "Alice".into(),
                    user_id: "uA".into(),
                    message: "hi".into(),
                    timestamp: 0,
                },
            )
            .await
            .unwrap();
        let msg = rx.recv().await.unwrap();
        match msg {
            Message::Text(text) => assert!(text.contains("\"chat\"")),
            _ => panic!("expected text message"),
        }
    }
}
