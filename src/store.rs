//! Room store: owns every room record and hands out exclusive per-room access.
//!
//! Game operations only lock the outer map long enough to clone a room
//! handle, so different rooms never contend. Each room sits behind its own
//! mutex, which the game engine holds for a whole check-mutate-advance step.
//! Joining and room removal lock the map shard first and the room second;
//! nothing takes them in the other order.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RoomError;
use crate::types::*;

pub struct RoomStore {
    rooms: DashMap<RoomId, Arc<Mutex<Room>>>,
    max_players_per_room: usize,
}

impl RoomStore {
    pub fn new(max_players_per_room: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            max_players_per_room,
        }
    }

    pub fn max_players_per_room(&self) -> usize {
        self.max_players_per_room
    }

    /// Clone the room handle out of the map; the shard guard drops before the room is locked
    fn handle(&self, room_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(room_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Create an empty room with a fresh id
    pub fn create_room(&self) -> RoomId {
        let id = ulid::Ulid::new().to_string();
        self.rooms
            .insert(id.clone(), Arc::new(Mutex::new(Room::new(id.clone()))));
        tracing::info!(room_id = %id, "Room created");
        id
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Cloned copy of the room record
    pub fn get_room(&self, room_id: &str) -> Option<Room> {
        self.with_room(room_id, |room| room.clone())
    }

    /// Run `f` with shared access to the room, under the room's lock
    pub fn with_room<T>(&self, room_id: &str, f: impl FnOnce(&Room) -> T) -> Option<T> {
        let handle = self.handle(room_id)?;
        let room = handle.lock();
        Some(f(&room))
    }

    /// Run `f` with exclusive access to the room for its whole duration
    pub fn with_room_mut<T>(&self, room_id: &str, f: impl FnOnce(&mut Room) -> T) -> Option<T> {
        let handle = self.handle(room_id)?;
        let mut room = handle.lock();
        Some(f(&mut room))
    }

    pub fn remove_room(&self, room_id: &str) -> Option<Room> {
        let (_, handle) = self.rooms.remove(room_id)?;
        tracing::info!(%room_id, "Room removed");
        let room = handle.lock().clone();
        Some(room)
    }

    /// Remove the room only if nobody is seated in it, checked and removed in one step
    pub fn remove_if_empty(&self, room_id: &str) -> bool {
        let removed = self
            .rooms
            .remove_if(room_id, |_, handle| handle.lock().players.is_empty())
            .is_some();
        if removed {
            tracing::info!(%room_id, "Empty room removed");
        }
        removed
    }

    /// Drop rooms where every player has been disconnected for at least `grace`.
    ///
    /// Rooms with no players at all go too. Returns the removed room ids.
    pub fn remove_abandoned(&self, grace: Duration, now: DateTime<Utc>) -> Vec<RoomId> {
        let cutoff = chrono::Duration::from_std(grace)
            .ok()
            .and_then(|grace| now.checked_sub_signed(grace));
        let mut removed = Vec::new();

        self.rooms.retain(|room_id, handle| {
            let room = handle.lock();
            let abandoned = room.players.values().all(|p| {
                match (p.connected, p.disconnected_at, cutoff) {
                    (false, Some(at), Some(cutoff)) => at <= cutoff,
                    _ => false,
                }
            });
            if abandoned {
                removed.push(room_id.clone());
            }
            !abandoned
        });

        for room_id in &removed {
            tracing::info!(%room_id, "Abandoned room removed");
        }
        removed
    }

    pub fn player_count(&self, room_id: &str) -> usize {
        self.with_room(room_id, |room| room.player_count())
            .unwrap_or(0)
    }

    /// Add a player to an existing room.
    ///
    /// A known but disconnected player id is reattached instead of rejected,
    /// keeping its score. New players without a name get a generated one.
    pub fn join_player(
        &self,
        room_id: &str,
        player_id: Option<PlayerId>,
        name: Option<String>,
        connection: Option<ConnectionId>,
    ) -> Result<Player, RoomError> {
        let max_players = self.max_players_per_room;
        self.with_room_mut(room_id, |room| {
            seat_player(room, max_players, player_id, name, connection)
        })
        .unwrap_or_else(|| Err(RoomError::NotFound(room_id.to_string())))
    }

    /// Join the room with this id, creating it on first use.
    ///
    /// The map shard stays locked until the seat is taken, so the room cannot
    /// be removed as empty between its lookup and the join.
    pub fn join_or_create(
        &self,
        room_id: &str,
        player_id: Option<PlayerId>,
        name: Option<String>,
        connection: Option<ConnectionId>,
    ) -> Result<Player, RoomError> {
        let entry = self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            tracing::info!(%room_id, "Room created");
            Arc::new(Mutex::new(Room::new(room_id.to_string())))
        });
        let mut room = entry.value().lock();
        seat_player(
            &mut room,
            self.max_players_per_room,
            player_id,
            name,
            connection,
        )
    }

    /// Remove a player. Responses and guesses already collected are kept.
    pub fn remove_player(&self, room_id: &str, player_id: &str) -> Result<Player, RoomError> {
        self.with_room_mut(room_id, |room| {
            let player = room
                .players
                .remove(player_id)
                .ok_or_else(|| RoomError::NotInRoom(player_id.to_string(), room_id.to_string()))?;
            tracing::info!(%room_id, %player_id, "Player removed");
            Ok(player)
        })
        .unwrap_or_else(|| Err(RoomError::NotFound(room_id.to_string())))
    }

    pub fn set_connected(
        &self,
        room_id: &str,
        player_id: &str,
        connected: bool,
    ) -> Result<(), RoomError> {
        self.with_room_mut(room_id, |room| {
            let player = room
                .players
                .get_mut(player_id)
                .ok_or_else(|| RoomError::NotInRoom(player_id.to_string(), room_id.to_string()))?;
            player.connected = connected;
            if connected {
                player.disconnected_at = None;
            } else {
                player.connection = None;
                player.disconnected_at = Some(Utc::now());
            }
            Ok(())
        })
        .unwrap_or_else(|| Err(RoomError::NotFound(room_id.to_string())))
    }
}

fn seat_player(
    room: &mut Room,
    max_players: usize,
    player_id: Option<PlayerId>,
    name: Option<String>,
    connection: Option<ConnectionId>,
) -> Result<Player, RoomError> {
    let room_id = room.id.clone();

    if let Some(existing) = player_id.as_ref().and_then(|id| room.players.get_mut(id)) {
        if existing.connected {
            return Err(RoomError::AlreadyInRoom(existing.id.clone(), room_id));
        }
        existing.connected = true;
        existing.disconnected_at = None;
        existing.connection = connection;
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            existing.name = name;
        }
        tracing::info!(%room_id, player_id = %existing.id, "Player reconnected");
        return Ok(existing.clone());
    }

    if room.players.len() >= max_players {
        return Err(RoomError::RoomFull(room_id));
    }

    let id = player_id.unwrap_or_else(|| ulid::Ulid::new().to_string());
    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| generated_name(room.players.len()));

    let player = Player::new(id.clone(), name, connection);
    room.players.insert(id.clone(), player.clone());
    tracing::info!(
        %room_id,
        player_id = %id,
        name = %player.name,
        players = room.players.len(),
        "Player joined"
    );
    Ok(player)
}

fn generated_name(seat: usize) -> String {
    petname::petname(2, "-").unwrap_or_else(|| format!("player-{}", seat + 1))
}
