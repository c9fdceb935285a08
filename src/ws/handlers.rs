//! Client message dispatch
//!
//! Resolves the connection to (room, player), calls into the game engine,
//! pushes the new room state to the room and returns the direct reply.

use crate::app::AppState;
use crate::error::RoomError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::*;
use std::sync::Arc;

/// Per-connection identity
#[derive(Debug, Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub room_id: Option<RoomId>,
    pub player_id: Option<PlayerId>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            connection_id: ulid::Ulid::new().to_string(),
            room_id: None,
            player_id: None,
        }
    }

    fn seat(&self) -> Option<(&str, &str)> {
        Some((self.room_id.as_deref()?, self.player_id.as_deref()?))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Bail out with NOT_IN_ROOM unless the session has joined a room
macro_rules! require_seat {
    ($session:expr) => {
        match $session.seat() {
            Some(seat) => seat,
            None => {
                return Some(ServerMessage::error(
                    "NOT_IN_ROOM",
                    "Join a room first",
                ))
            }
        }
    };
}

/// Handle a client message and return the optional direct reply
pub fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    app: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::JoinRoom {
            room_id,
            player_id,
            name,
        } => handle_join(app, session, room_id, player_id, name),

        ClientMessage::LeaveRoom => {
            let (room_id, player_id) = require_seat!(session);
            let (room_id, player_id) = (room_id.to_string(), player_id.to_string());
            let reply = handle_leave(app, &room_id, &player_id);
            session.room_id = None;
            session.player_id = None;
            reply
        }

        ClientMessage::StartRound => {
            let (room_id, player_id) = require_seat!(session);
            handle_start_round(app, room_id, player_id)
        }

        ClientMessage::SubmitResponse { text } => {
            let (room_id, player_id) = require_seat!(session);
            handle_submit_response(app, room_id, player_id, text)
        }

        ClientMessage::SubmitGuess { response_index } => {
            let (room_id, player_id) = require_seat!(session);
            handle_submit_guess(app, room_id, player_id, response_index)
        }

        ClientMessage::GetState => {
            let (room_id, _) = require_seat!(session);
            match app.public_state(room_id) {
                Some(state) => Some(ServerMessage::State { state }),
                None => Some(room_gone()),
            }
        }

        ClientMessage::GetLeaderboard => {
            let (room_id, _) = require_seat!(session);
            Some(ServerMessage::Leaderboard {
                entries: app.engine.get_leaderboard(room_id),
            })
        }

        ClientMessage::GetResults => {
            let (room_id, _) = require_seat!(session);
            match app.engine.get_round_results(room_id) {
                Some(results) => Some(ServerMessage::Results { results }),
                None => Some(ServerMessage::error(
                    "NO_RESULTS",
                    "Results are only available after a round has been scored",
                )),
            }
        }

        ClientMessage::GetScoringSummary => {
            let (room_id, _) = require_seat!(session);
            match app.engine.get_scoring_summary(room_id) {
                Some(summary) => Some(ServerMessage::ScoringSummary { summary }),
                None => Some(room_gone()),
            }
        }
    }
}

fn room_gone() -> ServerMessage {
    ServerMessage::error("ROOM_NOT_FOUND", "Room no longer exists")
}

fn handle_join(
    app: &Arc<AppState>,
    session: &mut Session,
    room_id: Option<RoomId>,
    player_id: Option<PlayerId>,
    name: Option<String>,
) -> Option<ServerMessage> {
    if session.room_id.is_some() {
        return Some(ServerMessage::error(
            "ALREADY_JOINED",
            "This connection already joined a room",
        ));
    }

    let store = app.engine.store();
    let room_id = match room_id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => ulid::Ulid::new().to_string(),
    };

    match store.join_or_create(
        &room_id,
        player_id,
        name,
        Some(session.connection_id.clone()),
    ) {
        Ok(player) => {
            session.room_id = Some(room_id.clone());
            session.player_id = Some(player.id.clone());
            app.broadcast_state(&room_id);
            Some(ServerMessage::Joined { room_id, player })
        }
        Err(e) => {
            let code = match e {
                RoomError::RoomFull(_) => "ROOM_FULL",
                RoomError::AlreadyInRoom(_, _) => "ALREADY_IN_ROOM",
                RoomError::NotFound(_) => "ROOM_NOT_FOUND",
                RoomError::NotInRoom(_, _) => "NOT_IN_ROOM",
            };
            tracing::warn!(%room_id, "Join rejected: {}", e);
            Some(ServerMessage::error(code, e.to_string()))
        }
    }
}

fn handle_leave(app: &Arc<AppState>, room_id: &str, player_id: &str) -> Option<ServerMessage> {
    let store = app.engine.store();
    if let Err(e) = store.remove_player(room_id, player_id) {
        tracing::warn!(%room_id, %player_id, "Leave rejected: {}", e);
        return Some(ServerMessage::error("NOT_IN_ROOM", e.to_string()));
    }
    tracing::info!(%room_id, %player_id, "Player left room");

    if store.remove_if_empty(room_id) {
        return Some(ServerMessage::accepted("leave_room"));
    }

    // The players still seated may all be done now
    if let Some(phase) = app.engine.check_phase_completion(room_id) {
        tracing::debug!(%room_id, %phase, "Phase after departure");
    }
    app.broadcast_state(room_id);
    Some(ServerMessage::accepted("leave_room"))
}

fn handle_start_round(
    app: &Arc<AppState>,
    room_id: &str,
    player_id: &str,
) -> Option<ServerMessage> {
    let (ok, reason) = app.engine.can_start_round(room_id);
    if !ok {
        return Some(ServerMessage::error("CANNOT_START", reason));
    }

    let Some(prompt) = app.prompts.draw() else {
        tracing::error!("Prompt deck is empty");
        return Some(ServerMessage::error("NO_PROMPTS", "No prompts available"));
    };

    if !app.engine.start_new_round(room_id, prompt) {
        // Lost a race against another start request
        let (_, reason) = app.engine.can_start_round(room_id);
        return Some(ServerMessage::error("CANNOT_START", reason));
    }

    tracing::info!(%room_id, %player_id, "Round started by player");
    app.broadcast_state(room_id);
    Some(ServerMessage::accepted("start_round"))
}

fn handle_submit_response(
    app: &Arc<AppState>,
    room_id: &str,
    player_id: &str,
    text: String,
) -> Option<ServerMessage> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return Some(ServerMessage::error(
            "EMPTY_RESPONSE",
            "Response cannot be empty",
        ));
    }
    let max_chars = app.engine.config().max_response_chars;
    if text.chars().count() > max_chars {
        return Some(ServerMessage::error(
            "RESPONSE_TOO_LONG",
            format!("Responses are limited to {} characters", max_chars),
        ));
    }

    if !app.engine.submit_player_response(room_id, player_id, text) {
        return Some(ServerMessage::error(
            "RESPONSE_REJECTED",
            "Response not accepted (wrong phase or already submitted)",
        ));
    }

    app.broadcast_state(room_id);
    Some(ServerMessage::accepted("submit_response"))
}

fn handle_submit_guess(
    app: &Arc<AppState>,
    room_id: &str,
    player_id: &str,
    response_index: ResponseIndex,
) -> Option<ServerMessage> {
    if !app
        .engine
        .submit_player_guess(room_id, player_id, response_index)
    {
        return Some(ServerMessage::error(
            "GUESS_REJECTED",
            "Guess not accepted (wrong phase, already guessed or unknown response)",
        ));
    }

    app.broadcast_state(room_id);
    Some(ServerMessage::accepted("submit_guess"))
}

/// Mark the session's player as disconnected; they keep their seat and score
pub fn handle_disconnect(session: &Session, app: &Arc<AppState>) {
    let Some((room_id, player_id)) = session.seat() else {
        return;
    };
    if let Err(e) = app
        .engine
        .store()
        .set_connected(room_id, player_id, false)
    {
        tracing::debug!(%room_id, %player_id, "Disconnect for unknown seat: {}", e);
        return;
    }
    tracing::info!(%room_id, %player_id, "Player disconnected");
    app.broadcast_state(room_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::prompts::PromptDeck;
    use crate::shuffle::NoShuffle;
    use crate::state::GameEngine;
    use crate::store::RoomStore;

    fn app() -> Arc<AppState> {
        let config = GameConfig::default();
        let store = Arc::new(RoomStore::new(config.max_players_per_room));
        let engine = GameEngine::with_shuffler(store, config, Arc::new(NoShuffle));
        Arc::new(AppState::new(engine, PromptDeck::builtin()))
    }

    fn expect_error(reply: Option<ServerMessage>, expected: &str) {
        match reply {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, expected),
            other => panic!("Expected {} error, got {:?}", expected, other),
        }
    }

    fn join(app: &Arc<AppState>, room: Option<&str>, name: &str) -> Session {
        let mut session = Session::new();
        let reply = handle_message(
            ClientMessage::JoinRoom {
                room_id: room.map(str::to_string),
                player_id: None,
                name: Some(name.to_string()),
            },
            &mut session,
            app,
        );
        assert!(matches!(reply, Some(ServerMessage::Joined { .. })));
        session
    }

    #[test]
    fn test_actions_require_join() {
        let app = app();
        let mut session = Session::new();

        expect_error(
            handle_message(ClientMessage::StartRound, &mut session, &app),
            "NOT_IN_ROOM",
        );
        expect_error(
            handle_message(ClientMessage::GetState, &mut session, &app),
            "NOT_IN_ROOM",
        );
    }

    #[test]
    fn test_join_without_room_creates_one() {
        let app = app();
        let session = join(&app, None, "Alice");

        let room_id = session.room_id.unwrap();
        assert!(app.engine.store().contains(&room_id));
        assert_eq!(app.engine.store().player_count(&room_id), 1);
    }

    #[test]
    fn test_double_join_rejected() {
        let app = app();
        let mut session = join(&app, Some("lobby"), "Alice");

        expect_error(
            handle_message(
                ClientMessage::JoinRoom {
                    room_id: Some("lobby".into()),
                    player_id: None,
                    name: None,
                },
                &mut session,
                &app,
            ),
            "ALREADY_JOINED",
        );
    }

    #[test]
    fn test_start_needs_two_players() {
        let app = app();
        let mut alice = join(&app, Some("lobby"), "Alice");

        expect_error(
            handle_message(ClientMessage::StartRound, &mut alice, &app),
            "CANNOT_START",
        );

        let _bob = join(&app, Some("lobby"), "Bob");
        let reply = handle_message(ClientMessage::StartRound, &mut alice, &app);
        assert!(matches!(reply, Some(ServerMessage::Accepted { .. })));
    }

    #[test]
    fn test_leaving_closes_phase_for_remaining_players() {
        let app = app();
        let mut alice = join(&app, Some("lobby"), "Alice");
        let mut bob = join(&app, Some("lobby"), "Bob");
        let mut carol = join(&app, Some("lobby"), "Carol");
        handle_message(ClientMessage::StartRound, &mut alice, &app);
        for session in [&mut alice, &mut bob] {
            handle_message(
                ClientMessage::SubmitResponse { text: "hi".into() },
                session,
                &app,
            );
        }
        assert_eq!(
            app.engine.get_game_state("lobby").unwrap().phase,
            GamePhase::Responding
        );

        let reply = handle_message(ClientMessage::LeaveRoom, &mut carol, &app);
        assert!(matches!(reply, Some(ServerMessage::Accepted { .. })));
        assert!(carol.room_id.is_none());
        assert_eq!(
            app.engine.get_game_state("lobby").unwrap().phase,
            GamePhase::Guessing
        );
        expect_error(
            handle_message(ClientMessage::GetState, &mut carol, &app),
            "NOT_IN_ROOM",
        );
    }

    #[test]
    fn test_last_player_leaving_removes_room() {
        let app = app();
        let mut alice = join(&app, Some("solo"), "Alice");

        handle_message(ClientMessage::LeaveRoom, &mut alice, &app);
        assert!(!app.engine.store().contains("solo"));
    }

    #[test]
    fn test_response_validation() {
        let app = app();
        let mut alice = join(&app, Some("lobby"), "Alice");
        let _bob = join(&app, Some("lobby"), "Bob");
        handle_message(ClientMessage::StartRound, &mut alice, &app);

        expect_error(
            handle_message(
                ClientMessage::SubmitResponse { text: "   ".into() },
                &mut alice,
                &app,
            ),
            "EMPTY_RESPONSE",
        );
        expect_error(
            handle_message(
                ClientMessage::SubmitResponse {
                    text: "x".repeat(501),
                },
                &mut alice,
                &app,
            ),
            "RESPONSE_TOO_LONG",
        );

        let ok = handle_message(
            ClientMessage::SubmitResponse { text: "hi".into() },
            &mut alice,
            &app,
        );
        assert!(matches!(ok, Some(ServerMessage::Accepted { .. })));
        expect_error(
            handle_message(
                ClientMessage::SubmitResponse { text: "again".into() },
                &mut alice,
                &app,
            ),
            "RESPONSE_REJECTED",
        );
    }

    #[test]
    fn test_disconnect_keeps_seat() {
        let app = app();
        let alice = join(&app, Some("lobby"), "Alice");

        handle_disconnect(&alice, &app);

        let room = app.engine.store().get_room("lobby").unwrap();
        let player = &room.players[alice.player_id.as_ref().unwrap()];
        assert!(!player.connected);
        assert_eq!(room.players.len(), 1);
    }
}
