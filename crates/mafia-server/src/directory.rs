use std::collections::HashMap;

use mafia_core::player::PlayerId;

/// Which room each connection currently occupies. A connection is in at most
/// one room at a time.
#[derive(Debug, Default)]
pub struct ConnectionDirectory {
    rooms: HashMap<PlayerId, String>,
}

impl ConnectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `player` with `room_code`, returning the room they were
    /// associated with before, if any.
    pub fn bind(&mut self, player: PlayerId, room_code: &str) -> Option<String> {
        self.rooms.insert(player, room_code.to_string())
    }

    /// Drop `player`'s association, returning the room they were in.
    pub fn unbind(&mut self, player: PlayerId) -> Option<String> {
        self.rooms.remove(&player)
    }

    pub fn room_of(&self, player: PlayerId) -> Option<&str> {
        self.rooms.get(&player).map(String::as_str)
    }

    /// Number of connections currently seated in some room.
    pub fn seated(&self) -> usize {
        self.rooms.len()
    }
}
