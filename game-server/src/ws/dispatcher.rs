//! C6 — WebSocket Dispatcher, and C7 — Disconnect Handler.

use std::time::Duration;

use protocol::{InboundFrame, OutboundFrame};
use serde_json::Value;
use tracing::debug;

use crate::connections::{compute_presence, subtract};
use crate::error::AppError;
use crate::state::AppState;
use crate::transport::Transport;

pub async fn handle_frame(state: &AppState, connection_id: &str, frame: InboundFrame, now: i64) -> Result<(), AppError> {
    let connection = state.connections.get(connection_id).await?.ok_or(AppError::NotFound)?;
    state.connections.touch(connection_id, now).await?;

    let game_id = frame.game_id.clone().unwrap_or_else(|| connection.game_id.clone());
    let deadline = Duration::from_secs(state.config.handler_deadline_secs);
    let transport: &dyn Transport = state.transport.as_ref();

    if frame.is_chat() {
        let game = state.games.get_game(&game_id).await?;
        let user_id = frame.user_id.clone().unwrap_or_else(|| connection.user_id.clone());
        let player = display_name_for(&game, &user_id);
        let message = frame.message.clone().unwrap_or_default();

        let out = OutboundFrame::Chat {
            game_id: game_id.clone(),
            player,
            user_id,
            message,
            timestamp: now,
        };

        let targets = state.connections.list_by_game(&game_id).await?;
        crate::ws::broadcast(transport, &state.connections, &targets, &out, deadline).await;
        return Ok(());
    }

    // Any other action is a state-changing action: persist the client's
    // description of the new mutable state verbatim and broadcast it.
    let new_state = Value::Object(frame.extra.clone());
    let game = state.games.apply_state_update(&game_id, new_state, now).await?;

    let out = OutboundFrame::GameStateUpdate {
        game_id: game_id.clone(),
        action: frame.action.clone(),
        game_state: game.mutable_state_only(),
        timestamp: now,
    };

    let targets = state.connections.list_by_game(&game_id).await?;
    crate::ws::broadcast(transport, &state.connections, &targets, &out, deadline).await;
    Ok(())
}

pub async fn disconnect(state: &AppState, connection_id: &str, now: i64) {
    let connection = match state.connections.get(connection_id).await {
        Ok(c) => c,
        Err(e) => {
            debug!(connection_id, error = %e, "disconnect: best-effort read failed");
            None
        }
    };

    if let Err(e) = state.connections.forget(connection_id).await {
        debug!(connection_id, error = %e, "disconnect: forget failed (row likely already gone)");
    }

    let Some(connection) = connection else {
        return;
    };

    let game = match state.games.get_game(&connection.game_id).await {
        Ok(g) => g,
        Err(_) => return,
    };

    let queried = state.connections.list_by_game(&connection.game_id).await.unwrap_or_default();
    let remaining = subtract(queried, connection_id);
    let presence = compute_presence(&game, &remaining);

    let frame = OutboundFrame::ConnectionStateUpdate {
        game_id: connection.game_id.clone(),
        connections: presence,
        timestamp: now,
    };

    let transport: &dyn Transport = state.transport.as_ref();
    crate::ws::broadcast(
        transport,
        &state.connections,
        &remaining,
        &frame,
        Duration::from_secs(state.config.handler_deadline_secs),
    )
    .await;
}

fn display_name_for(game: &protocol::Game, user_id: &str) -> String {
    if game.player1_id == user_id {
        return game.player1.display_name.clone();
    }
    if let Some(player2) = &game.player2 {
        if player2.user_id == user_id {
            return player2.display_name.clone();
        }
    }
    user_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::identity::IdentityGate;
    use crate::store::memory::MemoryStore;
    use crate::store::{PutCondition, Store, Table};
    use crate::transport::local::LocalTransport;
    use axum::extract::ws::Message;
    use protocol::Scenario;
    use std::sync::Arc;

    async fn seeded_state() -> (Arc<AppState>, String) {
        let config = Config::test_default();
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let identity = Arc::new(IdentityGate::new(&config, b"secret"));
        let transport = Arc::new(LocalTransport::new());
        let state = Arc::new(AppState::new(store.clone(), transport, identity, config));

        let scenario = Scenario {
            scenario_id: "s1".into(),
            creator_id: "uA".into(),
            title: "t".into(),
            description: "d".into(),
            columns: 1,
            rows: 1,
            turn_count: 1,
            hexes: vec![],
            created_at: 0,
        };
        store
            .put(Table::Scenarios, "s1", serde_json::to_value(&scenario).unwrap(), vec![], PutCondition::Always)
            .await
            .unwrap();

        let game = state.games.create_game("uA", Some("Alice".into()), "s1", 0).await.unwrap();
        state.games.join_game("uB", &game.game_id, Some("Bob".into()), 0).await.unwrap();
        (state, game.game_id)
    }

    /// Registers two connections (player1/player2) and attaches a transport
    /// channel to each, returning the receivers so tests can inspect what
    /// each socket would have been sent.
    async fn wire_two_connections(
        state: &AppState,
        game_id: &str,
    ) -> (tokio::sync::mpsc::UnboundedReceiver<Message>, tokio::sync::mpsc::UnboundedReceiver<Message>) {
        state.connections.register("c1", game_id, "uA", 1, 0).await.unwrap();
        state.connections.register("c2", game_id, "uB", 2, 0).await.unwrap();
        let (tx1, rx1) = tokio::sync::mpsc::unbounded_channel();
        let (tx2, rx2) = tokio::sync::mpsc::unbounded_channel();
        state.transport.attach("c1", tx1);
        state.transport.attach("c2", tx2);
        (rx1, rx2)
    }

    fn text_of(message: Message) -> String {
        match message {
            Message::Text(text) => text.to_string(),
            other => panic!("expected text message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_frame_broadcasts_to_the_other_player() {
        let (state, game_id) = seeded_state().await;
        let (_rx1, mut rx2) = wire_two_connections(&state, &game_id).await;

        let frame = InboundFrame {
            action: "chat".to_string(),
            game_id: Some(game_id.clone()),
            user_id: Some("uA".to_string()),
            message: Some("hi there".to_string()),
            extra: Default::default(),
        };
        handle_frame(&state, "c1", frame, 20).await.unwrap();

        let received = text_of(rx2.recv().await.unwrap());
        assert!(received.contains("\"chat\""));
        assert!(received.contains("hi there"));
        assert!(received.contains("Alice"));
    }

    #[tokio::test]
    async fn non_chat_action_persists_state_and_broadcasts_without_scenario_snapshot() {
        let (state, game_id) = seeded_state().await;
        let (_rx1, mut rx2) = wire_two_connections(&state, &game_id).await;

        let mut extra = serde_json::Map::new();
        extra.insert("unit".to_string(), serde_json::json!("u1"));
        let frame = InboundFrame {
            action: "moveUnit".to_string(),
            game_id: Some(game_id.clone()),
            user_id: Some("uA".to_string()),
            message: None,
            extra,
        };
        handle_frame(&state, "c1", frame, 20).await.unwrap();

        let stored = state.games.get_game(&game_id).await.unwrap();
        assert_eq!(stored.game_state["unit"], "u1");

        let received = text_of(rx2.recv().await.unwrap());
        assert!(received.contains("gameStateUpdate"));
        assert!(received.contains("\"unit\":\"u1\""));
        assert!(!received.contains("scenarioSnapshot"));
    }

    #[tokio::test]
    async fn disconnect_reaps_the_row_and_broadcasts_updated_presence() {
        let (state, game_id) = seeded_state().await;
        let (_rx1, mut rx2) = wire_two_connections(&state, &game_id).await;

        disconnect(&state, "c1", 30).await;

        assert!(state.connections.get("c1").await.unwrap().is_none());
        let remaining = state.connections.list_by_game(&game_id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].connection_id, "c2");

        let received = text_of(rx2.recv().await.unwrap());
        assert!(received.contains("connectionStateUpdate"));
        assert!(received.contains("\"connected\":false"));
    }

    #[tokio::test]
    async fn multi_device_disconnect_preserves_presence_for_remaining_socket() {
        let (state, game_id) = seeded_state().await;
        state.connections.register("c1a", &game_id, "uA", 1, 0).await.unwrap();
        state.connections.register("c1b", &game_id, "uA", 1, 0).await.unwrap();
        state.connections.register("c2", &game_id, "uB", 2, 0).await.unwrap();
        let (tx2, mut rx2) = tokio::sync::mpsc::unbounded_channel();
        state.transport.attach("c2", tx2);

        disconnect(&state, "c1a", 30).await;

        let received = text_of(rx2.recv().await.unwrap());
        assert!(received.contains("\"player1\":{\"connected\":true"));
    }
}
