use crate::app::AppState;
use crate::state::GameEngine;
use crate::types::{GamePhase, RoomId};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Force every room whose phase deadline has passed into its next phase.
///
/// Returns the rooms that moved, with their new phase.
pub fn tick_expired_rooms(engine: &GameEngine) -> Vec<(RoomId, GamePhase)> {
    let mut advanced = Vec::new();

    for room_id in engine.store().room_ids() {
        let Some(before) = engine.get_game_state(&room_id).map(|s| s.phase) else {
            continue;
        };
        if before == GamePhase::Waiting || !engine.is_phase_expired(&room_id) {
            continue;
        }

        // Re-checked under the room lock; a racing organic completion wins
        match engine.advance_expired_phase(&room_id) {
            Some(after) if after != before => advanced.push((room_id, after)),
            Some(_) => {}
            None => tracing::warn!(%room_id, "Deadline advance failed"),
        }
    }

    advanced
}

/// Drop rooms whose players have all been gone for longer than the reconnect window
pub fn sweep_abandoned_rooms(engine: &GameEngine) -> Vec<RoomId> {
    engine
        .store()
        .remove_abandoned(engine.config().abandoned_room_grace, Utc::now())
}

/// Spawn a background task that advances rooms whose phase timer ran out
pub fn spawn_phase_deadline_watcher(state: Arc<AppState>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            for (room_id, phase) in tick_expired_rooms(&state.engine) {
                tracing::debug!(%room_id, %phase, "Broadcasting deadline transition");
                state.broadcast_state(&room_id);
            }
            sweep_abandoned_rooms(&state.engine);
            state.prune_channels();
        }
    });
}
