use std::fmt;

use thiserror::Error;

use crate::room::Phase;

/// What a player was trying to do when a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    NightAction,
    Vote,
    Chat,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NightAction => write!(f, "act"),
            Self::Vote => write!(f, "vote"),
            Self::Chat => write!(f, "chat"),
        }
    }
}

/// Broad category of a [`GameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// The sender is not allowed to do this.
    Authorization,
    /// The request does not fit the room's current state.
    State,
    /// A bounded resource ran out.
    ResourceExhaustion,
}

/// A refused request. The `Display` text is the feedback shown to the
/// player who sent it; no room state is touched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Lobby not found.")]
    RoomNotFound,

    #[error("Game already started.")]
    GameAlreadyStarted,

    #[error("Only host can start.")]
    NotHost,

    #[error("Need at least {needed} players (have {have}).")]
    InsufficientPlayers { needed: usize, have: usize },

    #[error("You are not in a room.")]
    NotInRoom,

    #[error("You are dead and cannot {0}.")]
    Dead(ActionKind),

    #[error("You cannot {action} during the {phase} phase.")]
    WrongPhase { action: ActionKind, phase: Phase },

    #[error("That is not a valid target.")]
    InvalidTarget,

    #[error("You cannot target another Mafia!")]
    FriendlyTarget,

    #[error("You cannot chat right now.")]
    ChatBlocked,

    #[error("Invalid name: {0}.")]
    InvalidName(&'static str),

    #[error("Invalid message: {0}.")]
    InvalidMessage(&'static str),

    #[error("Could not generate a unique room code after {attempts} attempts.")]
    CodeExhaustion { attempts: usize },

    #[error("Cannot seat {special} special roles among {players} players.")]
    RoleAssignmentImpossible { players: usize, special: usize },
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName(_) | Self::InvalidMessage(_) => ErrorKind::Validation,
            Self::NotHost
            | Self::NotInRoom
            | Self::Dead(_)
            | Self::InvalidTarget
            | Self::FriendlyTarget
            | Self::ChatBlocked => ErrorKind::Authorization,
            Self::RoomNotFound
            | Self::GameAlreadyStarted
            | Self::InsufficientPlayers { .. }
            | Self::WrongPhase { .. }
            | Self::RoleAssignmentImpossible { .. } => ErrorKind::State,
            Self::CodeExhaustion { .. } => ErrorKind::ResourceExhaustion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_text_reads_naturally() {
        assert_eq!(
            GameError::Dead(ActionKind::Vote).to_string(),
            "You are dead and cannot vote."
        );
        assert_eq!(
            GameError::WrongPhase {
                action: ActionKind::NightAction,
                phase: Phase::Day,
            }
            .to_string(),
            "You cannot act during the day phase."
        );
        assert_eq!(
            GameError::InsufficientPlayers { needed: 4, have: 2 }.to_string(),
            "Need at least 4 players (have 2)."
        );
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(GameError::InvalidName("too long").kind(), ErrorKind::Validation);
        assert_eq!(GameError::NotHost.kind(), ErrorKind::Authorization);
        assert_eq!(GameError::RoomNotFound.kind(), ErrorKind::State);
        assert_eq!(
            GameError::CodeExhaustion { attempts: 50 }.kind(),
            ErrorKind::ResourceExhaustion
        );
    }
}
