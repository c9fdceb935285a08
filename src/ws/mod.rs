pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt, Sink};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::app::AppState;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::RoomId;
use handlers::Session;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_json<S>(sender: &mut S, msg: &ServerMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Broadcast receiver for the room the session currently sits in
#[derive(Default)]
struct RoomSubscription {
    room_id: Option<RoomId>,
    rx: Option<broadcast::Receiver<ServerMessage>>,
}

impl RoomSubscription {
    /// Follow the session into a new room, or drop the receiver after a leave
    fn sync(&mut self, session: &Session, state: &AppState) {
        if self.room_id == session.room_id {
            return;
        }
        self.rx = session.room_id.as_deref().map(|id| state.subscribe(id));
        self.room_id = session.room_id.clone();
    }

    async fn recv(&mut self) -> Result<ServerMessage, broadcast::error::RecvError> {
        match &mut self.rx {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = Session::new();

    tracing::info!(connection_id = %session.connection_id, "WebSocket connected");

    let welcome = ServerMessage::Welcome {
        protocol: "1.0".to_string(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_json(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    let mut subscription = RoomSubscription::default();

    loop {
        tokio::select! {
            room_msg = subscription.recv() => {
                match room_msg {
                    Ok(msg) => {
                        if !send_json(&mut sender, &msg).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Client lagging behind room broadcasts");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        subscription.rx = None;
                    }
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                let reply = handlers::handle_message(client_msg, &mut session, &state);
                                subscription.sync(&session, &state);
                                reply
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::error(
                                    "PARSE_ERROR",
                                    format!("Invalid message format: {}", e),
                                ))
                            }
                        };

                        if let Some(reply) = reply {
                            if !send_json(&mut sender, &reply).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    handlers::handle_disconnect(&session, &state);
    tracing::info!(connection_id = %session.connection_id, "WebSocket connection closed");
}
