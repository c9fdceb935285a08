//! Shared server state handed to the WebSocket layer and the deadline watcher

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::prompts::PromptDeck;
use crate::protocol::{PublicGameState, ServerMessage};
use crate::state::GameEngine;
use crate::types::*;

const ROOM_CHANNEL_CAPACITY: usize = 100;

pub struct AppState {
    pub engine: GameEngine,
    pub prompts: PromptDeck,
    /// One broadcast channel per room, created on first subscribe
    channels: DashMap<RoomId, broadcast::Sender<ServerMessage>>,
}

impl AppState {
    pub fn new(engine: GameEngine, prompts: PromptDeck) -> Self {
        Self {
            engine,
            prompts,
            channels: DashMap::new(),
        }
    }

    pub fn subscribe(&self, room_id: &str) -> broadcast::Receiver<ServerMessage> {
        self.channels
            .entry(room_id.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn broadcast_to_room(&self, room_id: &str, msg: ServerMessage) {
        if let Some(tx) = self.channels.get(room_id) {
            // No receivers connected is fine
            let _ = tx.send(msg);
        }
    }

    pub fn public_state(&self, room_id: &str) -> Option<PublicGameState> {
        let snapshot = self.engine.get_game_state(room_id)?;
        let players = self.engine.store().player_count(room_id);
        Some(PublicGameState::new(&snapshot, players))
    }

    /// Push the room state to everyone in the room; in RESULTS also the report and leaderboard
    pub fn broadcast_state(&self, room_id: &str) {
        let Some(state) = self.public_state(room_id) else {
            return;
        };
        let phase = state.phase;
        self.broadcast_to_room(room_id, ServerMessage::State { state });

        if phase == GamePhase::Results {
            if let Some(results) = self.engine.get_round_results(room_id) {
                self.broadcast_to_room(room_id, ServerMessage::Results { results });
            }
            self.broadcast_to_room(
                room_id,
                ServerMessage::Leaderboard {
                    entries: self.engine.get_leaderboard(room_id),
                },
            );
        }
    }

    /// Drop channels of rooms that no longer exist
    pub fn prune_channels(&self) {
        let store = self.engine.store();
        self.channels.retain(|room_id, _| store.contains(room_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::store::RoomStore;
    use std::sync::Arc;

    fn app() -> AppState {
        let store = Arc::new(RoomStore::new(8));
        AppState::new(
            GameEngine::new(store, GameConfig::default()),
            PromptDeck::builtin(),
        )
    }

    #[tokio::test]
    async fn test_broadcast_reaches_room_subscribers_only() {
        let app = app();
        let a = app.engine.store().create_room();
        let b = app.engine.store().create_room();
        let mut rx_a = app.subscribe(&a);
        let mut rx_b = app.subscribe(&b);

        app.broadcast_state(&a);

        match rx_a.recv().await.unwrap() {
            ServerMessage::State { state } => assert_eq!(state.room_id, a),
            other => panic!("Expected State message, got {:?}", other),
        }
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_prune_channels() {
        let app = app();
        let room_id = app.engine.store().create_room();
        let _rx = app.subscribe(&room_id);
        app.engine.store().remove_room(&room_id);

        app.prune_channels();
        assert!(app.channels.is_empty());
    }
}
