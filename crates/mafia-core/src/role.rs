use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::player::Player;

/// The fixed role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Villager,
    Mafia,
    Detective,
    Doctor,
    Jester,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Villager => "Villager",
            Self::Mafia => "Mafia",
            Self::Detective => "Detective",
            Self::Doctor => "Doctor",
            Self::Jester => "Jester",
        };
        f.write_str(name)
    }
}

/// How many of each special role a game of `n` players gets.
/// Everyone not covered here is a Villager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleCounts {
    pub mafia: usize,
    pub detective: usize,
    pub doctor: usize,
    pub jester: usize,
}

impl RoleCounts {
    pub fn for_players(n: usize) -> Self {
        Self {
            mafia: if n > 7 { 2 } else { 1 },
            detective: 1,
            doctor: 1,
            jester: 1,
        }
    }

    pub fn special(&self) -> usize {
        self.mafia + self.detective + self.doctor + self.jester
    }

    /// Special roles in the order they are dealt.
    fn in_precedence(&self) -> [(Role, usize); 4] {
        [
            (Role::Mafia, self.mafia),
            (Role::Detective, self.detective),
            (Role::Doctor, self.doctor),
            (Role::Jester, self.jester),
        ]
    }
}

/// Deal one role to every player and revive everyone.
///
/// Player indices are shuffled uniformly; the first `mafia` shuffled slots
/// become Mafia, the next Detective, then Doctor, then Jester, and the rest
/// Villager. Fails without touching any player if there are fewer players
/// than special roles.
pub fn assign_roles<R: Rng + ?Sized>(
    players: &mut [Player],
    rng: &mut R,
) -> Result<RoleCounts, GameError> {
    let n = players.len();
    let counts = RoleCounts::for_players(n);
    if counts.special() > n {
        return Err(GameError::RoleAssignmentImpossible {
            players: n,
            special: counts.special(),
        });
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut roles = vec![Role::Villager; n];
    let mut slots = order.into_iter();
    for (role, count) in counts.in_precedence() {
        for idx in slots.by_ref().take(count) {
            roles[idx] = role;
        }
    }

    for (player, role) in players.iter_mut().zip(roles) {
        player.role = Some(role);
        player.alive = true;
    }
    Ok(counts)
}
