use super::GameEngine;
use crate::types::*;
use chrono::Utc;

impl GameEngine {
    pub(super) fn expired(room: &Room) -> bool {
        room.elapsed_seconds(Utc::now()) >= room.phase_duration as f64
    }

    /// Whether the current phase has run past its duration. False for a missing room.
    pub fn is_phase_expired(&self, room_id: &str) -> bool {
        self.store
            .with_room(room_id, Self::expired)
            .unwrap_or(false)
    }

    /// Seconds left in the current phase, never negative. 0 for a missing room.
    pub fn get_phase_time_remaining(&self, room_id: &str) -> f64 {
        self.store
            .with_room(room_id, |room| {
                (room.phase_duration as f64 - room.elapsed_seconds(Utc::now())).max(0.0)
            })
            .unwrap_or(0.0)
    }

    pub fn get_game_state(&self, room_id: &str) -> Option<GameStateSnapshot> {
        self.store.with_room(room_id, Room::snapshot)
    }
}
