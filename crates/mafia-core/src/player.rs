use serde::{Deserialize, Serialize};

use crate::envelope::SYSTEM_SENDER;
use crate::error::GameError;
use crate::role::Role;

/// Identifies a connection, and the player it controls while seated in a room.
pub type PlayerId = u64;

/// Maximum display name length, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// A participant seated in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Unset until the game starts.
    pub role: Option<Role>,
    /// Starts true and only ever flips to false.
    pub alive: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: None,
            alive: true,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    pub fn is_mafia(&self) -> bool {
        self.has_role(Role::Mafia)
    }
}

/// What everyone in the room may see about a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            alive: p.alive,
        }
    }
}

/// Trim a requested display name, substituting `fallback` when it is blank.
pub fn normalize_name(raw: &str, fallback: &str) -> Result<String, GameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Ok(fallback.to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::InvalidName("too long"));
    }
    if name.chars().any(char::is_control) {
        return Err(GameError::InvalidName("contains control characters"));
    }
    // announcements are sent under this name
    if name.eq_ignore_ascii_case(SYSTEM_SENDER) {
        return Err(GameError::InvalidName("reserved"));
    }
    Ok(name.to_string())
}
