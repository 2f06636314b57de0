use crate::envelope::Envelope;
use crate::error::{ActionKind, GameError};
use crate::net::messages::{ChatMessageMsg, ServerMessage};
use crate::player::PlayerId;
use crate::role::Role;
use crate::room::{Phase, Room};

/// Longest accepted chat line, in characters, after trimming.
pub const MAX_CHAT_LEN: usize = 1024;

/// Whether `player` may currently chat.
///
/// At night only living Mafia may talk, and only while at least two of them
/// are alive to hear each other. Dead players never chat.
pub fn can_chat(room: &Room, player: PlayerId) -> bool {
    let Some(p) = room.player(player) else {
        return false;
    };
    if !p.alive {
        return false;
    }
    match room.phase {
        Phase::Night => p.is_mafia() && living_mafia(room) >= 2,
        Phase::Waiting | Phase::Day | Phase::Ended => true,
    }
}

fn living_mafia(room: &Room) -> usize {
    room.living().filter(|p| p.has_role(Role::Mafia)).count()
}

fn clean_text(raw: &str) -> Result<&str, GameError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GameError::InvalidMessage("message is empty"));
    }
    if text.chars().count() > MAX_CHAT_LEN {
        return Err(GameError::InvalidMessage("message is too long"));
    }
    if text.chars().any(|c| c.is_control() && c != '\n') {
        return Err(GameError::InvalidMessage(
            "message contains control characters",
        ));
    }
    Ok(text)
}

/// Route a chat line from `sender`. Night chat goes to the living Mafia only,
/// flagged `mafia_only`; other phases reach the whole room.
pub fn submit_chat(
    room: &Room,
    sender: PlayerId,
    raw: &str,
) -> Result<Vec<Envelope>, GameError> {
    let player = room.player(sender).ok_or(GameError::NotInRoom)?;
    if !player.alive {
        return Err(GameError::Dead(ActionKind::Chat));
    }
    if !can_chat(room, sender) {
        return Err(GameError::ChatBlocked);
    }
    let text = clean_text(raw)?;

    let mafia_only = room.phase == Phase::Night;
    let msg = ServerMessage::ChatMessage(ChatMessageMsg {
        from: player.name.clone(),
        text: text.to_string(),
        mafia_only,
    });

    if !mafia_only {
        return Ok(vec![Envelope::room(msg)]);
    }
    Ok(room
        .living()
        .filter(|p| p.has_role(Role::Mafia))
        .map(|p| Envelope::player(p.id, msg.clone()))
        .collect())
}
