use crate::types::{PlayerId, RoomId};

/// Internal defects: the room's data invariants were broken upstream.
///
/// Never used for ordinary rejections, which are plain `false`/`None` returns.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GameError {
    #[error("room {0} has no prompt for the current round")]
    MissingPrompt(RoomId),

    #[error("prompt {prompt_id} in room {room_id} has no model response to inject")]
    MissingLlmResponse { room_id: RoomId, prompt_id: String },

    #[error("room {0} reached scoring without an LLM response")]
    NoLlmResponseToScore(RoomId),
}

/// Membership failures reported by the room store
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomId),
}
