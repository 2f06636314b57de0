use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use mafia_core::envelope::{Envelope, Recipient};
use mafia_core::error::GameError;
use mafia_core::net::messages::{ErrorMessageMsg, RoomCreatedMsg, ServerMessage};
use mafia_core::net::protocol::encode_server_message;
use mafia_core::phase::{self, Transition};
use mafia_core::player::{Player, PlayerId, normalize_name};
use mafia_core::room::{Phase, Room, generate_room_code, is_valid_room_code};
use mafia_core::{actions, chat};

use crate::config::GameConfig;
use crate::directory::ConnectionDirectory;

/// Per-connection sender for outbound WebSocket binary messages.
/// Bounded so a slow client cannot grow memory without limit.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Fallback display names for blank input.
const DEFAULT_HOST_NAME: &str = "Host";
const DEFAULT_PLAYER_NAME: &str = "Player";

/// When a room's current phase should end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseDeadline {
    pub room_code: String,
    /// Identifies the room instance, so a later room reusing the code is
    /// never advanced by this deadline.
    pub session: u64,
    pub phase: Phase,
    pub after: Duration,
}

struct RoomEntry {
    room: Room,
    session: u64,
    timer: Option<JoinHandle<()>>,
}

impl Drop for RoomEntry {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Owns every room, the connection directory, and each connection's
/// outbound channel.
pub struct RoomManager {
    rooms: HashMap<String, RoomEntry>,
    directory: ConnectionDirectory,
    connections: HashMap<PlayerId, PlayerSender>,
    next_player_id: PlayerId,
    next_session: u64,
    rng: StdRng,
    game: GameConfig,
}

impl RoomManager {
    pub fn new(game: GameConfig) -> Self {
        Self::with_rng(game, StdRng::from_os_rng())
    }

    pub fn with_rng(game: GameConfig, rng: StdRng) -> Self {
        Self {
            rooms: HashMap::new(),
            directory: ConnectionDirectory::new(),
            connections: HashMap::new(),
            next_player_id: 1,
            next_session: 1,
            rng,
            game,
        }
    }

    /// Register a new connection. The returned id is its player id in any
    /// room it later enters.
    pub fn connect(&mut self, sender: PlayerSender) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        self.connections.insert(id, sender);
        id
    }

    /// Forget a connection, leaving its room first.
    pub fn disconnect(&mut self, player_id: PlayerId) {
        self.leave_room(player_id);
        self.connections.remove(&player_id);
    }

    /// Create a room with `player_id` as its only player and host.
    pub fn create_room(
        &mut self,
        player_id: PlayerId,
        display_name: &str,
    ) -> Result<String, GameError> {
        let name = normalize_name(display_name, DEFAULT_HOST_NAME)?;
        let code = self.generate_unique_room_code()?;

        self.leave_room(player_id);

        let session = self.next_session;
        self.next_session += 1;
        self.rooms.insert(
            code.clone(),
            RoomEntry {
                room: Room::new(code.clone(), Player::new(player_id, name)),
                session,
                timer: None,
            },
        );
        self.directory.bind(player_id, &code);
        tracing::info!(room = %code, player_id, "Room created");

        self.send_to(
            player_id,
            &ServerMessage::RoomCreated(RoomCreatedMsg { code: code.clone() }),
        );
        self.broadcast_room_update(&code);
        Ok(code)
    }

    /// Seat `player_id` in the room with `code`. Joining a room the player is
    /// already in does nothing.
    pub fn join_room(
        &mut self,
        player_id: PlayerId,
        code: &str,
        display_name: &str,
    ) -> Result<(), GameError> {
        let code = code.trim();
        if !is_valid_room_code(code) {
            return Err(GameError::RoomNotFound);
        }
        let name = normalize_name(display_name, DEFAULT_PLAYER_NAME)?;
        {
            let entry = self.rooms.get(code).ok_or(GameError::RoomNotFound)?;
            if entry.room.contains(player_id) {
                return Ok(());
            }
            if entry.room.phase != Phase::Waiting {
                return Err(GameError::GameAlreadyStarted);
            }
        }

        self.leave_room(player_id);

        let Some(entry) = self.rooms.get_mut(code) else {
            return Err(GameError::RoomNotFound);
        };
        entry.room.add_player(player_id, name)?;
        self.directory.bind(player_id, code);
        tracing::info!(room = %code, player_id, "Player joined");

        self.broadcast_room_update(code);
        Ok(())
    }

    /// Remove `player_id` from whatever room they are in. An emptied room is
    /// destroyed along with its timer. Returns whether they were in a room.
    pub fn leave_room(&mut self, player_id: PlayerId) -> bool {
        let Some(code) = self.directory.unbind(player_id) else {
            return false;
        };
        let Some(entry) = self.rooms.get_mut(&code) else {
            return false;
        };

        entry.room.remove_player(player_id);
        tracing::info!(room = %code, player_id, "Player left");

        if entry.room.is_empty() {
            self.rooms.remove(&code);
            tracing::info!(room = %code, "Room destroyed");
        } else {
            self.broadcast_room_update(&code);
        }
        true
    }

    /// Start the game in the requester's room. On success returns the
    /// deadline of the first night, which the caller arms.
    pub fn start_game(&mut self, player_id: PlayerId) -> Result<Option<PhaseDeadline>, GameError> {
        let code = self
            .directory
            .room_of(player_id)
            .ok_or(GameError::NotInRoom)?;
        let entry = self.rooms.get_mut(code).ok_or(GameError::NotInRoom)?;

        let transition = phase::start_game(&mut entry.room, player_id, &mut self.rng)?;
        Ok(self.apply_transition(code, transition))
    }

    /// Store the timer task driving a room. A handle for a room that is gone
    /// or has been replaced is aborted.
    pub fn attach_timer(&mut self, deadline: &PhaseDeadline, handle: JoinHandle<()>) {
        match self.rooms.get_mut(&deadline.room_code) {
            Some(entry) if entry.session == deadline.session => {
                if let Some(old) = entry.timer.replace(handle) {
                    old.abort();
                }
            },
            _ => handle.abort(),
        }
    }

    pub fn submit_night_action(
        &mut self,
        player_id: PlayerId,
        target: PlayerId,
    ) -> Result<(), GameError> {
        self.with_room(player_id, |room| {
            actions::submit_night_action(room, player_id, target)
        })
    }

    pub fn submit_vote(&mut self, player_id: PlayerId, target: PlayerId) -> Result<(), GameError> {
        self.with_room(player_id, |room| actions::submit_vote(room, player_id, target))
    }

    pub fn submit_chat(&mut self, player_id: PlayerId, text: &str) -> Result<(), GameError> {
        self.with_room(player_id, |room| chat::submit_chat(room, player_id, text))
    }

    /// End the phase `deadline` was armed for and return the next deadline.
    /// Fires for a destroyed room, a replaced room, or a room that has
    /// already left that phase are ignored.
    pub fn fire_phase_timer(&mut self, deadline: &PhaseDeadline) -> Option<PhaseDeadline> {
        let Some(entry) = self.rooms.get_mut(&deadline.room_code) else {
            tracing::debug!(room = %deadline.room_code, "Timer fired for missing room");
            return None;
        };
        if entry.session != deadline.session || entry.room.phase != deadline.phase {
            tracing::debug!(
                room = %deadline.room_code,
                expected = %deadline.phase,
                actual = %entry.room.phase,
                "Ignoring stale phase timer"
            );
            return None;
        }

        let transition = phase::advance(&mut entry.room);
        self.apply_transition(&deadline.room_code, transition)
    }

    /// Send a rejection back to the player whose request caused it.
    pub fn send_error(&self, player_id: PlayerId, error: &GameError) {
        self.send_to(
            player_id,
            &ServerMessage::ErrorMessage(ErrorMessageMsg {
                text: error.to_string(),
            }),
        );
    }

    /// Room code `player_id` is seated in, if any.
    pub fn room_of(&self, player_id: PlayerId) -> Option<&str> {
        self.directory.room_of(player_id)
    }

    pub fn room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code).map(|e| &e.room)
    }

    /// Get stats: (active rooms, seated players).
    pub fn stats(&self) -> (usize, usize) {
        (self.rooms.len(), self.directory.seated())
    }

    fn with_room<F>(&mut self, player_id: PlayerId, f: F) -> Result<(), GameError>
    where
        F: FnOnce(&mut Room) -> Result<Vec<Envelope>, GameError>,
    {
        let code = self
            .directory
            .room_of(player_id)
            .ok_or(GameError::NotInRoom)?;
        let entry = self.rooms.get_mut(code).ok_or(GameError::NotInRoom)?;
        let envelopes = f(&mut entry.room)?;
        deliver(&self.connections, &entry.room, envelopes);
        Ok(())
    }

    /// Deliver a transition's messages to the room and turn its next phase
    /// into a deadline.
    fn apply_transition(&self, code: &str, transition: Transition) -> Option<PhaseDeadline> {
        let entry = self.rooms.get(code)?;
        deliver(&self.connections, &entry.room, transition.envelopes);

        let phase = transition.next?;
        Some(PhaseDeadline {
            room_code: code.to_string(),
            session: entry.session,
            phase,
            after: self.game.duration_of(phase)?,
        })
    }

    fn broadcast_room_update(&self, code: &str) {
        if let Some(entry) = self.rooms.get(code) {
            deliver(
                &self.connections,
                &entry.room,
                vec![Envelope::room(ServerMessage::RoomUpdate(entry.room.view()))],
            );
        }
    }

    fn send_to(&self, player_id: PlayerId, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => send_bytes(&self.connections, player_id, Bytes::from(data)),
            Err(e) => tracing::warn!(player_id, error = %e, "Failed to encode message"),
        }
    }

    /// Draw room codes until one is free, giving up after the configured
    /// number of attempts.
    fn generate_unique_room_code(&mut self) -> Result<String, GameError> {
        for _ in 0..self.game.code_attempts {
            let code = generate_room_code(&mut self.rng);
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        tracing::warn!(
            rooms = self.rooms.len(),
            attempts = self.game.code_attempts,
            "Room code space exhausted"
        );
        Err(GameError::CodeExhaustion {
            attempts: self.game.code_attempts,
        })
    }
}

/// Encode each envelope once and hand it to its recipients' channels.
/// Sends never wait: a full or closed channel skips that recipient.
fn deliver(connections: &HashMap<PlayerId, PlayerSender>, room: &Room, envelopes: Vec<Envelope>) {
    for envelope in envelopes {
        let data = match encode_server_message(&envelope.msg) {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                tracing::warn!(room = %room.code, error = %e, "Failed to encode message");
                continue;
            },
        };
        match envelope.to {
            Recipient::Room => {
                for player in &room.players {
                    send_bytes(connections, player.id, data.clone());
                }
            },
            Recipient::Player(id) => send_bytes(connections, id, data),
        }
    }
}

fn send_bytes(connections: &HashMap<PlayerId, PlayerSender>, player_id: PlayerId, data: Bytes) {
    let Some(sender) = connections.get(&player_id) else {
        return;
    };
    if let Err(e) = sender.try_send(data) {
        tracing::debug!(player_id, error = %e, "Skipping send to slow client");
    }
}
