use super::GameEngine;
use crate::types::*;

impl GameEngine {
    /// Reason the room cannot start a round right now, if any
    fn start_blocker(&self, room: &Room) -> Option<String> {
        if room.phase != GamePhase::Waiting {
            return Some(format!(
                "Round already in progress ({} phase)",
                room.phase
            ));
        }
        let players = room.player_count();
        if players < self.config.min_players {
            return Some(format!(
                "Need at least {} players to start (have {})",
                self.config.min_players, players
            ));
        }
        if players > self.config.max_players_per_room {
            return Some(format!(
                "Too many players (max {})",
                self.config.max_players_per_room
            ));
        }
        None
    }

    /// Whether a new round may start, with a human-readable reason when not
    pub fn can_start_round(&self, room_id: &str) -> (bool, String) {
        self.store
            .with_room(room_id, |room| match self.start_blocker(room) {
                Some(reason) => (false, reason),
                None => (true, "Ready to start".to_string()),
            })
            .unwrap_or_else(|| (false, "Room does not exist".to_string()))
    }

    /// Start the next round with `prompt`; only legal from WAITING
    pub fn start_new_round(&self, room_id: &str, prompt: Prompt) -> bool {
        let started = self.store.with_room_mut(room_id, |room| {
            if let Some(reason) = self.start_blocker(room) {
                tracing::warn!(%room_id, "Cannot start round: {}", reason);
                return false;
            }

            room.round_number += 1;
            room.current_prompt = Some(prompt);
            room.responses.clear();
            room.guesses.clear();
            room.enter_phase(GamePhase::Responding, self.config.response_time_limit);

            tracing::info!(
                %room_id,
                round = room.round_number,
                players = room.player_count(),
                "Round started"
            );
            true
        });

        started.unwrap_or(false)
    }
}
