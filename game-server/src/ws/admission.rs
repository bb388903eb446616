//! C5 — WebSocket Admission.

use std::time::Duration;

use tracing::warn;

use crate::connections::{compute_presence, union_with_self};
use crate::error::AppError;
use crate::state::AppState;
use crate::transport::Transport;

pub async fn admit(
    state: &AppState,
    connection_id: &str,
    game_id: &str,
    user_id: &str,
    token: Option<&str>,
    now: i64,
) -> Result<(), AppError> {
    match token {
        Some(token) => {
            let identity = state.identity.verify(token).await?;
            if identity.user_id != user_id {
                return Err(AppError::AuthInvalid("token subject does not match connecting user".into()));
            }
        }
        None => {
            if !state.config.allow_unverified_connect {
                return Err(AppError::AuthMissing);
            }
            warn!(game_id, user_id, "admitting connection without a verified token (allow_unverified_connect)");
        }
    }

    let game = state.games.get_game(game_id).await?;
    let player_index = game.player_index_for(user_id).ok_or(AppError::Forbidden)?;

    let connection = state.connections.register(connection_id, game_id, user_id, player_index, now).await?;

    let queried = state.connections.list_by_game(game_id).await?;
    let union = union_with_self(queried, Some(&connection));
    let presence = compute_presence(&game, &union);

    let frame = protocol::OutboundFrame::ConnectionStateUpdate {
        game_id: game_id.to_string(),
        connections: presence,
        timestamp: now,
    };

    let transport: &dyn Transport = state.transport.as_ref();
    crate::ws::broadcast(
        transport,
        &state.connections,
        &union,
        &frame,
        Duration::from_secs(state.config.handler_deadline_secs),
    )
    .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::identity::IdentityGate;
    use crate::store::memory::MemoryStore;
    use crate::store::{PutCondition, Store, Table};
    use crate::transport::local::LocalTransport;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use protocol::Scenario;
    use serde::Serialize;
    use std::sync::Arc;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        email: String,
        name: String,
        exp: u64,
    }

    fn mint(user_id: &str) -> String {
        let exp = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_secs() + 3600;
        let claims = Claims {
            sub: user_id.to_string(),
            email: "a@example.com".to_string(),
            name: "A".to_string(),
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(b"secret")).unwrap()
    }

    async fn seeded_state(allow_unverified: bool) -> (Arc<AppState>, String) {
        let mut config = Config::test_default();
        config.allow_unverified_connect = allow_unverified;
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
        (state, game.game_id)
    }

    #[tokio::test]
    async fn admit_registers_connection_with_self_in_presence() {
        let (state, game_id) = seeded_state(true).await;
        admit(&state, "c1", &game_id, "uA", None, 10).await.unwrap();
        let connections = state.connections.list_by_game(&game_id).await.unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].player_index, 1);
    }

    #[tokio::test]
    async fn admit_rejects_non_member_as_forbidden_and_writes_no_row() {
        let (state, game_id) = seeded_state(true).await;
        let err = admit(&state, "c1", &game_id, "uStranger", None, 10).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        assert!(state.connections.list_by_game(&game_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admit_without_token_requires_allow_unverified_connect() {
        let (state, game_id) = seeded_state(false).await;
        let err = admit(&state, "c1", &game_id, "uA", None, 10).await.unwrap_err();
        assert!(matches!(err, AppError::AuthMissing));
    }

    #[tokio::test]
    async fn admit_rejects_token_subject_mismatch() {
        let (state, game_id) = seeded_state(false).await;
        let token = mint("someone-else");
        let err = admit(&state, "c1", &game_id, "uA", Some(&token), 10).await.unwrap_err();
        assert!(matches!(err, AppError::AuthInvalid(_)));
    }

    #[tokio::test]
    async fn admit_with_valid_token_succeeds() {
        let (state, game_id) = seeded_state(false).await;
        let token = mint("uA");
        admit(&state, "c1", &game_id, "uA", Some(&token), 10).await.unwrap();
        assert_eq!(state.connections.list_by_game(&game_id).await.unwrap().len(), 1);
    }
}
