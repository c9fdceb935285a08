use crate::state::{LeaderboardEntry, RoundResults, ScoringSummary};
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join (or create, when `room_id` is absent) a room.
    /// Passing a known `player_id` reattaches a disconnected player.
    JoinRoom {
        room_id: Option<RoomId>,
        player_id: Option<PlayerId>,
        name: Option<String>,
    },
    /// Give up the seat; the player's score leaves with them
    LeaveRoom,
    StartRound,
    SubmitResponse {
        text: String,
    },
    SubmitGuess {
        response_index: ResponseIndex,
    },
    GetState,
    GetLeaderboard,
    GetResults,
    GetScoringSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
    },
    Joined {
        room_id: RoomId,
        player: Player,
    },
    State {
        state: PublicGameState,
    },
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    Results {
        results: RoundResults,
    },
    ScoringSummary {
        summary: ScoringSummary,
    },
    /// The action was applied
    Accepted {
        action: String,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }

    pub fn accepted(action: &str) -> Self {
        ServerMessage::Accepted {
            action: action.to_string(),
        }
    }
}

/// Response as shown to players (no authorship, no LLM flag)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicResponse {
    pub index: ResponseIndex,
    pub text: String,
}

/// Room state safe to broadcast while a round is running.
///
/// Response texts only appear once GUESSING opens; who wrote what stays
/// hidden until the results are sent separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicGameState {
    pub room_id: RoomId,
    pub phase: GamePhase,
    pub round_number: u32,
    pub prompt: Option<String>,
    pub responses: Vec<PublicResponse>,
    pub responded: Vec<PlayerId>,
    pub guessed: Vec<PlayerId>,
    pub player_count: usize,
    pub server_now: String,
    pub deadline: Option<String>,
}

impl PublicGameState {
    pub fn new(snapshot: &GameStateSnapshot, player_count: usize) -> Self {
        let responses = match snapshot.phase {
            GamePhase::Guessing | GamePhase::Results => snapshot
                .responses
                .iter()
                .map(|r| PublicResponse {
                    index: r.index,
                    text: r.text.clone(),
                })
                .collect(),
            GamePhase::Waiting | GamePhase::Responding => Vec::new(),
        };

        let mut responded: Vec<PlayerId> = snapshot
            .responses
            .iter()
            .filter_map(|r| r.author_id.clone())
            .collect();
        responded.sort();

        let mut guessed: Vec<PlayerId> = snapshot.guesses.keys().cloned().collect();
        guessed.sort();

        let deadline = match snapshot.phase {
            GamePhase::Waiting => None,
            _ => snapshot.phase_deadline().map(|d| d.to_rfc3339()),
        };

        Self {
            room_id: snapshot.room_id.clone(),
            phase: snapshot.phase,
            round_number: snapshot.round_number,
            prompt: snapshot.prompt.as_ref().map(|p| p.text.clone()),
            responses,
            responded,
            guessed,
            player_count,
            server_now: chrono::Utc::now().to_rfc3339(),
            deadline,
        }
    }
}
