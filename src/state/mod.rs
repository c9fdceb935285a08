//! Round state machine and scoring engine.
//!
//! Every operation takes the room's lock once, checks legality, applies the
//! change, evaluates auto-advance and releases. Expected rejections come back
//! as `false`/`None`; the room is left as it was.

mod guess;
mod phase;
mod response;
mod round;
mod score;
mod timer;

pub use score::{
    compute_round_results, GameStats, LeaderboardEntry, PlayerRoundResult, ResponseResult,
    RoundResults, ScoringRules, ScoringSummary, CORRECT_GUESS_POINTS, DECEPTION_POINTS,
};

use crate::config::GameConfig;
use crate::error::GameError;
use crate::shuffle::{RandomShuffler, ResponseShuffler};
use crate::store::RoomStore;
use crate::types::*;
use std::sync::Arc;

#[derive(Clone)]
pub struct GameEngine {
    store: Arc<RoomStore>,
    config: Arc<GameConfig>,
    shuffler: Arc<dyn ResponseShuffler>,
}

impl GameEngine {
    pub fn new(store: Arc<RoomStore>, config: GameConfig) -> Self {
        Self::with_shuffler(store, config, Arc::new(RandomShuffler))
    }

    pub fn with_shuffler(
        store: Arc<RoomStore>,
        config: GameConfig,
        shuffler: Arc<dyn ResponseShuffler>,
    ) -> Self {
        Self {
            store,
            config: Arc::new(config),
            shuffler,
        }
    }

    pub fn store(&self) -> &RoomStore {
        &self.store
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }
}

/// Apply `f` to a copy of the room and commit it only if `f` succeeds
fn staged<T>(
    room: &mut Room,
    f: impl FnOnce(&mut Room) -> Result<T, GameError>,
) -> Result<T, GameError> {
    let mut draft = room.clone();
    let out = f(&mut draft)?;
    *room = draft;
    Ok(out)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::shuffle::NoShuffle;

    pub fn prompt() -> Prompt {
        Prompt::new(
            "prompt-1",
            "Describe your perfect Sunday",
            "A slow breakfast, a long walk and an early night.",
            "test-model",
        )
    }

    /// Engine over a fresh store, unshuffled so the LLM response is always last
    pub fn engine_with(config: GameConfig) -> GameEngine {
        let store = Arc::new(RoomStore::new(config.max_players_per_room));
        GameEngine::with_shuffler(store, config, Arc::new(NoShuffle))
    }

    pub fn engine() -> GameEngine {
        engine_with(GameConfig::default())
    }

    /// Room with players `p1..=pn` named `Player1..`
    pub fn room_with_players(engine: &GameEngine, n: usize) -> RoomId {
        let room_id = engine.store().create_room();
        for i in 1..=n {
            engine
                .store()
                .join_player(
                    &room_id,
                    Some(format!("p{}", i)),
                    Some(format!("Player{}", i)),
                    None,
                )
                .unwrap();
        }
        room_id
    }

    /// Room in GUESSING with every player's response submitted
    pub fn room_in_guessing(engine: &GameEngine, n: usize) -> RoomId {
        let room_id = room_with_players(engine, n);
        assert!(engine.start_new_round(&room_id, prompt()));
        for i in 1..=n {
            assert!(engine.submit_player_response(
                &room_id,
                &format!("p{}", i),
                format!("answer from p{}", i)
            ));
        }
        room_id
    }

    /// Move the phase clock back so the current deadline has already passed
    pub fn expire_phase(engine: &GameEngine, room_id: &str) {
        engine.store().with_room_mut(room_id, |room| {
            room.phase_start_time =
                room.phase_start_time - chrono::Duration::seconds(room.phase_duration as i64 + 1);
        });
    }

    pub fn phase(engine: &GameEngine, room_id: &str) -> GamePhase {
        engine.get_game_state(room_id).unwrap().phase
    }

    pub fn index_of_author(engine: &GameEngine, room_id: &str, author: &str) -> usize {
        engine
            .get_game_state(room_id)
            .unwrap()
            .responses
            .iter()
            .find(|r| r.author_id.as_deref() == Some(author))
            .map(|r| r.index)
            .unwrap()
    }

    pub fn llm_index(engine: &GameEngine, room_id: &str) -> usize {
        engine
            .get_game_state(room_id)
            .unwrap()
            .responses
            .iter()
            .find(|r| r.is_llm)
            .map(|r| r.index)
            .unwrap()
    }

    pub fn score_of(engine: &GameEngine, room_id: &str, player_id: &str) -> u32 {
        engine
            .store()
            .with_room(room_id, |room| room.players[player_id].score)
            .unwrap()
    }
}
