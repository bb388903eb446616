//! WebSocket surface: admission (C5), dispatch (C6), and disconnect (C7),
//! wired onto an axum upgrade route.

pub mod admission;
pub mod dispatcher;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use protocol::OutboundFrame;

use crate::connections::ConnectionRegistry;
use crate::error::AppError;
use crate::state::{now_unix, AppState};
use crate::transport::{PostError, Transport};

#[derive(Deserialize)]
pub struct ConnectQuery {
    #[serde(rename = "gameId", default)]
    pub game_id: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn upgrade_handler(
    Query(query): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let game_id = query.game_id.clone().ok_or_else(|| AppError::BadRequest("missing gameId".into()))?;
    let user_id = query.user_id.clone().ok_or_else(|| AppError::BadRequest("missing userId".into()))?;
    let token = query.token.clone();

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, game_id, user_id, token)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, game_id: String, user_id: String, token: Option<String>) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    state.transport.attach(&connection_id, tx);

    let admitted = admission::admit(&state, &connection_id, &game_id, &user_id, token.as_deref(), now_unix()).await;
    if let Err(err) = admitted {
        debug!(connection_id, game_id, user_id, error = %err, "ws admission rejected");
        let frame = err.into_ws_frame();
        if let Ok(json) = serde_json::to_string(&frame) {
            let _ = ws_sender.send(Message::Text(json.into())).await;
        }
        state.transport.detach(&connection_id);
        return;
    }

    let write_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if ws_sender.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = ws_receiver.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let frame = match serde_json::from_str::<protocol::InboundFrame>(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(connection_id, error = %e, "dropping unparseable inbound frame");
                continue;
            }
        };
        if let Err(err) = dispatcher::handle_frame(&state, &connection_id, frame, now_unix()).await {
            debug!(connection_id, error = %err, "frame dispatch failed");
            let ws_error = err.into_ws_frame();
            let _ = state.transport.post(&connection_id, &ws_error).await;
        }
    }

    dispatcher::disconnect(&state, &connection_id, now_unix()).await;
    state.transport.detach(&connection_id);
    write_task.abort();
}

/// Pushes `frame` to every connection in `targets`, bounded by `deadline`
/// for the fan-out as a whole. Terminal failures (gone/forbidden) reap the
/// Connection row; transient failures are logged and otherwise ignored.
pub async fn broadcast(
    transport: &dyn Transport,
    connections: &ConnectionRegistry,
    targets: &[protocol::Connection],
    frame: &OutboundFrame,
    deadline: Duration,
) {
    let posts = targets.iter().map(|target| async move {
        match transport.post(&target.connection_id, frame).await {
            Ok(()) => {}
            Err(PostError::Gone) | Err(PostError::Forbidden) => {
                if let Err(e) = connections.forget(&target.connection_id).await {
                    warn!(connection_id = %target.connection_id, error = %e, "failed to reap stale connection");
                }
            }
            Err(PostError::Transient) => {
                warn!(connection_id = %target.connection_id, "transient broadcast failure");
            }
        }
    });

    if tokio::time::timeout(deadline, futures_util::future::join_all(posts)).await.is_err() {
        warn!(target_count = targets.len(), "broadcast fan-out abandoned after deadline");
    }
}
