use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::net::messages::RoomUpdateMsg;
use crate::player::{Player, PlayerId, PlayerView};
use crate::win::Winner;

/// Smallest and largest room code. Codes are always four decimal digits.
pub const ROOM_CODE_MIN: u16 = 1000;
pub const ROOM_CODE_MAX: u16 = 9999;

/// Where a room is in its game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Night,
    Day,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Waiting => "waiting",
            Self::Night => "night",
            Self::Day => "day",
            Self::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// A night choice and who made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightChoice {
    pub actor: PlayerId,
    pub target: PlayerId,
}

impl NightChoice {
    pub fn involves(&self, id: PlayerId) -> bool {
        self.actor == id || self.target == id
    }
}

/// Secret actions gathered during the current phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingActions {
    pub mafia_target: Option<NightChoice>,
    pub doctor_save: Option<NightChoice>,
    pub detective_check: Option<NightChoice>,
    /// voter -> target
    pub votes: HashMap<PlayerId, PlayerId>,
}

impl PendingActions {
    /// Drop everything cast by or aimed at `id`.
    pub fn forget(&mut self, id: PlayerId) {
        for slot in [
            &mut self.mafia_target,
            &mut self.doctor_save,
            &mut self.detective_check,
        ] {
            if slot.is_some_and(|choice| choice.involves(id)) {
                *slot = None;
            }
        }
        self.votes.remove(&id);
        self.votes.retain(|_, target| *target != id);
    }
}

/// One isolated game instance.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    pub host: PlayerId,
    pub phase: Phase,
    /// Join order.
    pub players: Vec<Player>,
    pub actions: PendingActions,
    pub winner: Option<Winner>,
}

impl Room {
    pub fn new(code: String, host: Player) -> Self {
        Self {
            code,
            host: host.id,
            phase: Phase::Waiting,
            players: vec![host],
            actions: PendingActions::default(),
            winner: None,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    pub fn living(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    pub fn name_of(&self, id: PlayerId) -> Option<&str> {
        self.player(id).map(|p| p.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Seat a new player. Returns `Ok(false)` if they were already seated.
    pub fn add_player(&mut self, id: PlayerId, name: String) -> Result<bool, GameError> {
        if self.contains(id) {
            return Ok(false);
        }
        if self.phase != Phase::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        self.players.push(Player::new(id, name));
        Ok(true)
    }

    /// Remove a player. If they were host, the earliest remaining joiner
    /// becomes host. Returns whether anyone was removed.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        if self.players.len() == before {
            return false;
        }
        self.actions.forget(id);
        if self.host == id
            && let Some(next) = self.players.first()
        {
            self.host = next.id;
        }
        true
    }

    /// Public snapshot of the room. Never carries roles or pending actions.
    pub fn view(&self) -> RoomUpdateMsg {
        RoomUpdateMsg {
            code: self.code.clone(),
            host: self.host,
            phase: self.phase,
            players: self.players.iter().map(PlayerView::from).collect(),
        }
    }
}

/// Generate a random four-digit room code. Uniqueness is the caller's job.
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.random_range(ROOM_CODE_MIN..=ROOM_CODE_MAX).to_string()
}

/// Check that a code has the shape `generate_room_code` produces.
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == 4
        && code.bytes().all(|b| b.is_ascii_digit())
        && !code.starts_with('0')
}
