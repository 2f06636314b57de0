use crate::net::messages::{ChatMessageMsg, ServerMessage};
use crate::player::PlayerId;

/// Sender name used for game announcements and private notices.
pub const SYSTEM_SENDER: &str = "System";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Everyone seated in the room, dead or alive.
    Room,
    Player(PlayerId),
}

/// An outbound message produced by the engine, addressed but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub to: Recipient,
    pub msg: ServerMessage,
}

impl Envelope {
    pub fn room(msg: ServerMessage) -> Self {
        Self {
            to: Recipient::Room,
            msg,
        }
    }

    pub fn player(id: PlayerId, msg: ServerMessage) -> Self {
        Self {
            to: Recipient::Player(id),
            msg,
        }
    }

    /// A system line for the whole room.
    pub fn announce(text: impl Into<String>) -> Self {
        Self::room(system_line(text.into()))
    }

    /// A system line for one player only.
    pub fn notice(id: PlayerId, text: impl Into<String>) -> Self {
        Self::player(id, system_line(text.into()))
    }
}

fn system_line(text: String) -> ServerMessage {
    ServerMessage::ChatMessage(ChatMessageMsg {
        from: SYSTEM_SENDER.to_string(),
        text,
        mafia_only: false,
    })
}
