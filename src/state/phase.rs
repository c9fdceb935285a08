use super::{staged, GameEngine};
use crate::error::GameError;
use crate::types::*;

impl GameEngine {
    pub(super) fn everyone_responded(room: &Room) -> bool {
        !room.players.is_empty() && room.players.keys().all(|id| room.has_responded(id))
    }

    pub(super) fn everyone_guessed(room: &Room) -> bool {
        !room.players.is_empty() && room.players.keys().all(|id| room.guesses.contains_key(id))
    }

    /// Whether `player_id`'s response is the last one outstanding
    pub(super) fn closes_responding(room: &Room, player_id: &str) -> bool {
        room.players
            .keys()
            .all(|id| id == player_id || room.has_responded(id))
    }

    pub(super) fn closes_guessing(room: &Room, player_id: &str) -> bool {
        room.players
            .keys()
            .all(|id| id == player_id || room.guesses.contains_key(id))
    }

    /// Inject the LLM response, shuffle, and open GUESSING.
    ///
    /// No-op unless the room is in RESPONDING.
    pub(super) fn complete_responding(&self, room: &mut Room) -> Result<(), GameError> {
        if room.phase != GamePhase::Responding {
            return Ok(());
        }

        if !room.has_llm_response() {
            let prompt = room
                .current_prompt
                .as_ref()
                .ok_or_else(|| GameError::MissingPrompt(room.id.clone()))?;
            let text = prompt
                .llm_response
                .clone()
                .ok_or_else(|| GameError::MissingLlmResponse {
                    room_id: room.id.clone(),
                    prompt_id: prompt.id.clone(),
                })?;

            room.responses.push(Response {
                index: room.responses.len(),
                text,
                is_llm: true,
                author_id: None,
            });
            self.shuffler.shuffle(&mut room.responses);
            for (index, response) in room.responses.iter_mut().enumerate() {
                response.index = index;
            }
        }

        room.enter_phase(GamePhase::Guessing, self.config.guessing_time_limit);
        tracing::info!(
            room_id = %room.id,
            round = room.round_number,
            responses = room.responses.len(),
            "Guessing phase opened"
        );
        Ok(())
    }

    /// Score the round and open RESULTS. No-op unless the room is in GUESSING.
    pub(super) fn complete_guessing(&self, room: &mut Room) -> Result<(), GameError> {
        if room.phase != GamePhase::Guessing {
            return Ok(());
        }

        self.score_room(room)?;
        room.enter_phase(GamePhase::Results, self.config.results_display_time);
        tracing::info!(
            room_id = %room.id,
            round = room.round_number,
            guesses = room.guesses.len(),
            "Results phase opened"
        );
        Ok(())
    }

    /// Back to the lobby. Round data stays until the next round starts.
    pub(super) fn complete_results(&self, room: &mut Room) -> Result<(), GameError> {
        if room.phase != GamePhase::Results {
            return Ok(());
        }

        room.enter_phase(GamePhase::Waiting, 0);
        tracing::info!(room_id = %room.id, round = room.round_number, "Back to waiting");
        Ok(())
    }

    /// Single completion routine shared by organic and forced advancement.
    ///
    /// Only acts if the room is still in `from`; otherwise reports the current phase.
    fn complete_phase(&self, room: &mut Room, from: GamePhase) -> Result<GamePhase, GameError> {
        if room.phase != from {
            return Ok(room.phase);
        }
        match from {
            // A round needs a prompt, which only start_new_round supplies
            GamePhase::Waiting => {}
            GamePhase::Responding => self.complete_responding(room)?,
            GamePhase::Guessing => self.complete_guessing(room)?,
            GamePhase::Results => self.complete_results(room)?,
        }
        Ok(room.phase)
    }

    fn complete_locked(&self, room: &mut Room, from: GamePhase) -> Option<GamePhase> {
        match staged(room, |draft| self.complete_phase(draft, from)) {
            Ok(phase) => Some(phase),
            Err(e) => {
                tracing::error!(room_id = %room.id, %from, "Phase transition failed: {}", e);
                None
            }
        }
    }

    /// Force the room into the next phase regardless of who has acted.
    ///
    /// Leaving RESPONDING still injects and shuffles; leaving GUESSING scores
    /// whatever guesses exist. WAITING stays put. Returns the new phase, or
    /// None if the room is missing or the transition hit an internal defect.
    pub fn advance_game_phase(&self, room_id: &str) -> Option<GamePhase> {
        self.store
            .with_room_mut(room_id, |room| {
                let from = room.phase;
                let to = self.complete_locked(room, from)?;
                if from != to {
                    tracing::info!(%room_id, %from, %to, "Phase advanced by force");
                }
                Some(to)
            })
            .flatten()
    }

    /// Advance only if the current phase's deadline has passed.
    ///
    /// Expiry is checked under the same lock as the transition, so a timer
    /// racing an organic completion cannot skip the freshly opened phase.
    pub fn advance_expired_phase(&self, room_id: &str) -> Option<GamePhase> {
        self.store
            .with_room_mut(room_id, |room| {
                let from = room.phase;
                if from == GamePhase::Waiting || !Self::expired(room) {
                    return Some(from);
                }
                let to = self.complete_locked(room, from)?;
                tracing::info!(%room_id, %from, %to, "Phase deadline expired");
                Some(to)
            })
            .flatten()
    }

    /// Re-evaluate the completion predicate, e.g. after a player left the room
    pub fn check_phase_completion(&self, room_id: &str) -> Option<GamePhase> {
        self.store
            .with_room_mut(room_id, |room| {
                let from = room.phase;
                let done = match from {
                    GamePhase::Responding => Self::everyone_responded(room),
                    GamePhase::Guessing => Self::everyone_guessed(room),
                    GamePhase::Waiting | GamePhase::Results => false,
                };
                if !done {
                    return Some(from);
                }
                self.complete_locked(room, from)
            })
            .flatten()
    }
}
