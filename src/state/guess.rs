use super::{staged, GameEngine};
use crate::types::*;

impl GameEngine {
    /// Record which response a player believes is machine-written.
    ///
    /// Guessing your own response is allowed; it just never pays out.
    pub fn submit_player_guess(
        &self,
        room_id: &str,
        player_id: &str,
        response_index: ResponseIndex,
    ) -> bool {
        let accepted = self.store.with_room_mut(room_id, |room| {
            if room.phase != GamePhase::Guessing {
                tracing::warn!(%room_id, %player_id, phase = %room.phase, "Guess outside guessing phase");
                return false;
            }
            if !room.players.contains_key(player_id) {
                tracing::warn!(%room_id, %player_id, "Guess from unknown player");
                return false;
            }
            if room.guesses.contains_key(player_id) {
                tracing::warn!(%room_id, %player_id, "Duplicate guess rejected");
                return false;
            }
            if response_index >= room.responses.len() {
                tracing::warn!(
                    %room_id,
                    %player_id,
                    response_index,
                    responses = room.responses.len(),
                    "Guess index out of range"
                );
                return false;
            }

            tracing::debug!(
                %room_id,
                %player_id,
                response_index,
                guessed = room.guesses.len() + 1,
                players = room.player_count(),
                "Guess accepted"
            );

            if !Self::closes_guessing(room, player_id) {
                room.guesses.insert(player_id.to_string(), response_index);
                return true;
            }

            let result = staged(room, |draft| {
                draft.guesses.insert(player_id.to_string(), response_index);
                self.complete_guessing(draft)
            });

            match result {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(%room_id, "Failed to close guessing phase: {}", e);
                    false
                }
            }
        });

        accepted.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::state::test_support::*;
    use crate::types::*;

    #[test]
    fn test_submit_guess() {
        let engine = engine();
        let room_id = room_in_guessing(&engine, 3);

        assert!(engine.submit_player_guess(&room_id, "p1", 0));

        let state = engine.get_game_state(&room_id).unwrap();
        assert_eq!(state.guesses.get("p1"), Some(&0));
        assert_eq!(state.phase, GamePhase::Guessing);
    }

    #[test]
    fn test_duplicate_guess_rejected() {
        let engine = engine();
        let room_id = room_in_guessing(&engine, 3);

        assert!(engine.submit_player_guess(&room_id, "p1", 0));
        assert!(!engine.submit_player_guess(&room_id, "p1", 1));
        assert_eq!(
            engine.get_game_state(&room_id).unwrap().guesses.get("p1"),
            Some(&0)
        );
    }

    #[test]
    fn test_guess_index_out_of_range() {
        let engine = engine();
        let room_id = room_in_guessing(&engine, 2);

        assert!(!engine.submit_player_guess(&room_id, "p1", 3));
        assert!(engine.submit_player_guess(&room_id, "p1", 2));
    }

    #[test]
    fn test_guess_rejected_outside_phase_or_unknown_player() {
        let engine = engine();
        let room_id = room_with_players(&engine, 2);
        engine.start_new_round(&room_id, prompt());

        assert!(!engine.submit_player_guess(&room_id, "p1", 0));

        engine.submit_player_response(&room_id, "p1", "a".into());
        engine.submit_player_response(&room_id, "p2", "b".into());
        assert!(!engine.submit_player_guess(&room_id, "stranger", 0));
        assert!(!engine.submit_player_guess("ghost-room", "p1", 0));
        assert!(engine.get_game_state(&room_id).unwrap().guesses.is_empty());
    }

    #[test]
    fn test_self_guess_allowed() {
        let engine = engine();
        let room_id = room_in_guessing(&engine, 2);
        let own = index_of_author(&engine, &room_id, "p1");

        assert!(engine.submit_player_guess(&room_id, "p1", own));
    }

    #[test]
    fn test_last_guess_advances_to_results() {
        let engine = engine();
        let room_id = room_in_guessing(&engine, 2);

        assert!(engine.get_round_results(&room_id).is_none());
        assert!(engine.submit_player_guess(&room_id, "p1", 0));
        assert!(engine.get_round_results(&room_id).is_none());
        assert!(engine.submit_player_guess(&room_id, "p2", 1));

        let state = engine.get_game_state(&room_id).unwrap();
        assert_eq!(state.phase, GamePhase::Results);
        assert_eq!(state.phase_duration, 30);
        assert!(engine.get_round_results(&room_id).is_some());

        // Too late now
        assert!(!engine.submit_player_guess(&room_id, "p1", 2));
    }
}
