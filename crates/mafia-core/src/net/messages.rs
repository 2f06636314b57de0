use serde::{Deserialize, Serialize};

use crate::player::{PlayerId, PlayerView};
use crate::role::Role;
use crate::room::Phase;
use crate::win::Winner;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    CreateRoom = 0x01,
    JoinRoom = 0x02,
    LeaveRoom = 0x03,
    StartGame = 0x04,
    SubmitChat = 0x05,
    SubmitNightAction = 0x06,
    SubmitVote = 0x07,

    // Server -> Client
    RoomCreated = 0x10,
    RoomUpdate = 0x11,
    PhaseChanged = 0x12,
    RoleAssigned = 0x13,
    InvestigationResult = 0x14,
    ChatMessage = 0x15,
    ErrorMessage = 0x16,
    GameOver = 0x17,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::CreateRoom),
            0x02 => Some(Self::JoinRoom),
            0x03 => Some(Self::LeaveRoom),
            0x04 => Some(Self::StartGame),
            0x05 => Some(Self::SubmitChat),
            0x06 => Some(Self::SubmitNightAction),
            0x07 => Some(Self::SubmitVote),
            0x10 => Some(Self::RoomCreated),
            0x11 => Some(Self::RoomUpdate),
            0x12 => Some(Self::PhaseChanged),
            0x13 => Some(Self::RoleAssigned),
            0x14 => Some(Self::InvestigationResult),
            0x15 => Some(Self::ChatMessage),
            0x16 => Some(Self::ErrorMessage),
            0x17 => Some(Self::GameOver),
            _ => None,
        }
    }

    /// Whether clients are allowed to send this type.
    pub fn is_from_client(self) -> bool {
        (self as u8) < 0x10
    }
}

// ---- Client -> Server ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomMsg {
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub code: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRoomMsg {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGameMsg {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitChatMsg {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitNightActionMsg {
    pub target_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitVoteMsg {
    pub target_id: PlayerId,
}

// ---- Server -> Client ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCreatedMsg {
    pub code: String,
}

/// Room snapshot broadcast after every visible change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUpdateMsg {
    pub code: String,
    pub host: PlayerId,
    pub phase: Phase,
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChangedMsg {
    pub phase: Phase,
}

/// Sent privately to each player when the game starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignedMsg {
    pub role: Role,
}

/// Sent privately to living Detectives at dawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigationResultMsg {
    pub target_name: String,
    pub is_mafia: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageMsg {
    pub from: String,
    pub text: String,
    /// Set on night messages only the Mafia can see.
    pub mafia_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessageMsg {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverMsg {
    pub winner: Winner,
}

/// Messages sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    CreateRoom(CreateRoomMsg),
    JoinRoom(JoinRoomMsg),
    LeaveRoom(LeaveRoomMsg),
    StartGame(StartGameMsg),
    SubmitChat(SubmitChatMsg),
    SubmitNightAction(SubmitNightActionMsg),
    SubmitVote(SubmitVoteMsg),
}

/// Messages sent from the server to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    RoomCreated(RoomCreatedMsg),
    RoomUpdate(RoomUpdateMsg),
    PhaseChanged(PhaseChangedMsg),
    RoleAssigned(RoleAssignedMsg),
    InvestigationResult(InvestigationResultMsg),
    ChatMessage(ChatMessageMsg),
    ErrorMessage(ErrorMessageMsg),
    GameOver(GameOverMsg),
}
