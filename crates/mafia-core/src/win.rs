use std::fmt;

use serde::{Deserialize, Serialize};

use crate::role::Role;
use crate::room::Room;

/// Which side took the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Mafia,
    Villagers,
    /// Only reachable by the Jester being voted out.
    Jester,
}

impl Winner {
    pub fn announcement(self) -> &'static str {
        match self {
            Self::Mafia => "Mafia wins!",
            Self::Villagers => "Villagers win!",
            Self::Jester => "Jester wins!",
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mafia => "Mafia",
            Self::Villagers => "Villagers",
            Self::Jester => "Jester",
        };
        f.write_str(name)
    }
}

/// Decide whether the living players have settled the game.
///
/// Mafia wins once it is at least as numerous as the living players who are
/// neither Mafia nor Jester; everyone else wins once no Mafia is left. The
/// Jester win is decided at vote resolution, not here.
pub fn evaluate(room: &Room) -> Option<Winner> {
    let mut mafia_alive = 0usize;
    let mut others_alive = 0usize;
    for player in room.living() {
        match player.role {
            Some(Role::Mafia) => mafia_alive += 1,
            Some(Role::Jester) => {},
            _ => others_alive += 1,
        }
    }

    if mafia_alive > 0 && mafia_alive >= others_alive {
        Some(Winner::Mafia)
    } else if mafia_alive == 0 {
        Some(Winner::Villagers)
    } else {
        None
    }
}
