use super::{staged, GameEngine};
use crate::types::*;

impl GameEngine {
    /// Record a player's response; the last one in closes RESPONDING
    pub fn submit_player_response(&self, room_id: &str, player_id: &str, text: String) -> bool {
        let accepted = self.store.with_room_mut(room_id, |room| {
            if room.phase != GamePhase::Responding {
                tracing::warn!(%room_id, %player_id, phase = %room.phase, "Response outside responding phase");
                return false;
            }
            if !room.players.contains_key(player_id) {
                tracing::warn!(%room_id, %player_id, "Response from unknown player");
                return false;
            }
            if room.has_responded(player_id) {
                tracing::warn!(%room_id, %player_id, "Duplicate response rejected");
                return false;
            }

            let response = Response {
                index: room.responses.len(),
                text,
                is_llm: false,
                author_id: Some(player_id.to_string()),
            };
            tracing::debug!(
                %room_id,
                %player_id,
                submitted = room.human_response_count() + 1,
                players = room.player_count(),
                "Response accepted"
            );

            if !Self::closes_responding(room, player_id) {
                room.responses.push(response);
                return true;
            }

            // Last one in: the response and the phase change commit together
            let result = staged(room, |draft| {
                draft.responses.push(response);
                self.complete_responding(draft)
            });

            match result {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(%room_id, "Failed to close responding phase: {}", e);
                    false
                }
            }
        });

        accepted.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GameConfig;
    use crate::state::test_support::*;
    use crate::types::*;

    #[test]
    fn test_submit_response() {
        let engine = engine();
        let room_id = room_with_players(&engine, 3);
        engine.start_new_round(&room_id, prompt());

        assert!(engine.submit_player_response(&room_id, "p1", "hello".into()));

        let state = engine.get_game_state(&room_id).unwrap();
        assert_eq!(state.phase, GamePhase::Responding);
        assert_eq!(state.responses.len(), 1);
        assert_eq!(state.responses[0].author_id.as_deref(), Some("p1"));
        assert!(!state.responses[0].is_llm);
    }

    #[test]
    fn test_duplicate_response_rejected() {
        let engine = engine();
        let room_id = room_with_players(&engine, 3);
        engine.start_new_round(&room_id, prompt());

        assert!(engine.submit_player_response(&room_id, "p1", "first".into()));
        assert!(!engine.submit_player_response(&room_id, "p1", "second".into()));

        let state = engine.get_game_state(&room_id).unwrap();
        assert_eq!(state.responses.len(), 1);
        assert_eq!(state.responses[0].text, "first");
    }

    #[test]
    fn test_response_rejected_outside_phase_or_unknown_player() {
        let engine = engine();
        let room_id = room_with_players(&engine, 2);

        assert!(!engine.submit_player_response(&room_id, "p1", "too early".into()));

        engine.start_new_round(&room_id, prompt());
        assert!(!engine.submit_player_response(&room_id, "stranger", "hi".into()));
        assert!(!engine.submit_player_response("ghost-room", "p1", "hi".into()));
        assert!(engine.get_game_state(&room_id).unwrap().responses.is_empty());
    }

    #[test]
    fn test_last_response_injects_llm_and_advances() {
        let engine = engine();
        let room_id = room_in_guessing(&engine, 3);

        let state = engine.get_game_state(&room_id).unwrap();
        assert_eq!(state.phase, GamePhase::Guessing);
        assert_eq!(state.phase_duration, 120);
        assert_eq!(state.responses.len(), 4);

        let llm: Vec<_> = state.responses.iter().filter(|r| r.is_llm).collect();
        assert_eq!(llm.len(), 1);
        assert!(llm[0].author_id.is_none());
        assert_eq!(Some(llm[0].text.clone()), prompt().llm_response);

        for (i, response) in state.responses.iter().enumerate() {
            assert_eq!(response.index, i);
        }
    }

    #[test]
    fn test_response_after_guessing_rejected() {
        let engine = engine();
        let room_id = room_in_guessing(&engine, 2);

        assert!(!engine.submit_player_response(&room_id, "p1", "late".into()));
        assert_eq!(engine.get_game_state(&room_id).unwrap().responses.len(), 3);
    }

    #[test]
    fn test_malformed_prompt_leaves_room_untouched() {
        let engine = engine_with(GameConfig::default());
        let room_id = room_with_players(&engine, 2);
        let mut broken = prompt();
        broken.llm_response = None;
        engine.start_new_round(&room_id, broken);

        assert!(engine.submit_player_response(&room_id, "p1", "one".into()));
        assert!(!engine.submit_player_response(&room_id, "p2", "two".into()));

        let state = engine.get_game_state(&room_id).unwrap();
        assert_eq!(state.phase, GamePhase::Responding);
        assert_eq!(state.responses.len(), 1);
    }
}
