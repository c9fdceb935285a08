use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque ID types for type safety
pub type RoomId = String;
pub type PlayerId = String;
pub type PromptId = String;
pub type ConnectionId = String;

/// Position of a response in the shuffled sequence; the only address guesses use
pub type ResponseIndex = usize;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Waiting,
    Responding,
    Guessing,
    Results,
}

impl GamePhase {
    /// The phase that follows this one in the round cycle
    pub fn next(self) -> Self {
        match self {
            GamePhase::Waiting => GamePhase::Responding,
            GamePhase::Responding => GamePhase::Guessing,
            GamePhase::Guessing => GamePhase::Results,
            GamePhase::Results => GamePhase::Waiting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GamePhase::Waiting => "waiting",
            GamePhase::Responding => "responding",
            GamePhase::Guessing => "guessing",
            GamePhase::Results => "results",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt payload handed to a round by the prompt source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub id: PromptId,
    pub text: String,
    /// Text injected as the machine-generated response
    pub llm_response: Option<String>,
    /// Name of the model that produced `llm_response`
    pub model: String,
}

impl Prompt {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        llm_response: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            llm_response: Some(llm_response.into()),
            model: model.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub connection: Option<ConnectionId>,
    /// Cumulative score for the lifetime of the room
    pub score: u32,
    pub connected: bool,
    /// When the player's socket went away; None while connected
    #[serde(skip)]
    pub disconnected_at: Option<DateTime<Utc>>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, connection: Option<ConnectionId>) -> Self {
        Self {
            id,
            name,
            connection,
            score: 0,
            connected: true,
            disconnected_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub index: ResponseIndex,
    pub text: String,
    pub is_llm: bool,
    /// None for the LLM response
    pub author_id: Option<PlayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub phase: GamePhase,
    pub round_number: u32,
    pub current_prompt: Option<Prompt>,
    pub responses: Vec<Response>,
    pub guesses: HashMap<PlayerId, ResponseIndex>,
    pub phase_start_time: DateTime<Utc>,
    /// Seconds
    pub phase_duration: u64,
    pub players: HashMap<PlayerId, Player>,
    /// Round number that has already been scored (scoring runs at most once per round)
    pub scored_round: Option<u32>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            phase: GamePhase::Waiting,
            round_number: 0,
            current_prompt: None,
            responses: Vec::new(),
            guesses: HashMap::new(),
            phase_start_time: Utc::now(),
            phase_duration: 0,
            players: HashMap::new(),
            scored_round: None,
        }
    }

    /// Switch to `phase` and restart its clock
    pub fn enter_phase(&mut self, phase: GamePhase, duration_secs: u64) {
        self.phase = phase;
        self.phase_start_time = Utc::now();
        self.phase_duration = duration_secs;
    }

    /// Seconds elapsed since the phase started, as of `now`
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.phase_start_time).num_milliseconds() as f64 / 1000.0
    }

    pub fn has_responded(&self, player_id: &str) -> bool {
        self.responses
            .iter()
            .any(|r| r.author_id.as_deref() == Some(player_id))
    }

    pub fn human_response_count(&self) -> usize {
        self.responses.iter().filter(|r| !r.is_llm).count()
    }

    pub fn has_llm_response(&self) -> bool {
        self.responses.iter().any(|r| r.is_llm)
    }

    pub fn llm_response_index(&self) -> Option<ResponseIndex> {
        self.responses.iter().find(|r| r.is_llm).map(|r| r.index)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            room_id: self.id.clone(),
            phase: self.phase,
            prompt: self.current_prompt.clone(),
            responses: self.responses.clone(),
            guesses: self.guesses.clone(),
            round_number: self.round_number,
            phase_start_time: self.phase_start_time,
            phase_duration: self.phase_duration,
        }
    }
}

/// Read-only view of a room's round state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameStateSnapshot {
    pub room_id: RoomId,
    pub phase: GamePhase,
    pub prompt: Option<Prompt>,
    pub responses: Vec<Response>,
    pub guesses: HashMap<PlayerId, ResponseIndex>,
    pub round_number: u32,
    pub phase_start_time: DateTime<Utc>,
    pub phase_duration: u64,
}

impl GameStateSnapshot {
    /// When the current phase runs out; None if that lies past the last representable instant
    pub fn phase_deadline(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.phase_duration).ok()?;
        self.phase_start_time
            .checked_add_signed(chrono::Duration::try_seconds(secs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_cycle() {
        let mut phase = GamePhase::Waiting;
        let mut seen = Vec::new();
        for _ in 0..4 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                GamePhase::Responding,
                GamePhase::Guessing,
                GamePhase::Results,
                GamePhase::Waiting
            ]
        );
    }

    #[test]
    fn test_phase_serializes_screaming_case() {
        let json = serde_json::to_string(&GamePhase::Guessing).unwrap();
        assert_eq!(json, "\"GUESSING\"");
    }

    #[test]
    fn test_new_room_is_waiting() {
        let room = Room::new("r1".to_string());
        assert_eq!(room.phase, GamePhase::Waiting);
        assert_eq!(room.round_number, 0);
        assert!(room.responses.is_empty());
        assert!(room.llm_response_index().is_none());
    }

    #[test]
    fn test_phase_deadline() {
        let mut room = Room::new("r1".to_string());
        room.enter_phase(GamePhase::Responding, 90);
        let deadline = room.snapshot().phase_deadline().unwrap();
        assert_eq!((deadline - room.phase_start_time).num_seconds(), 90);

        room.enter_phase(GamePhase::Responding, 10_000_000_000_000);
        assert!(room.snapshot().phase_deadline().is_none());
        room.enter_phase(GamePhase::Responding, u64::MAX);
        assert!(room.snapshot().phase_deadline().is_none());
    }

    #[test]
    fn test_has_responded_ignores_llm() {
        let mut room = Room::new("r1".to_string());
        room.responses.push(Response {
            index: 0,
            text: "beep".to_string(),
            is_llm: true,
            author_id: None,
        });
        room.responses.push(Response {
            index: 1,
            text: "hi".to_string(),
            is_llm: false,
            author_id: Some("p1".to_string()),
        });

        assert!(room.has_responded("p1"));
        assert!(!room.has_responded("p2"));
        assert_eq!(room.human_response_count(), 1);
        assert_eq!(room.llm_response_index(), Some(0));
    }
}
