use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::messages::{
    ChatMessageMsg, ClientMessage, CreateRoomMsg, ErrorMessageMsg, GameOverMsg,
    InvestigationResultMsg, JoinRoomMsg, LeaveRoomMsg, MessageType, PhaseChangedMsg,
    RoleAssignedMsg, RoomCreatedMsg, RoomUpdateMsg, ServerMessage, StartGameMsg, SubmitChatMsg,
    SubmitNightActionMsg, SubmitVoteMsg,
};

/// Maximum message size in bytes, type prefix included.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    EmptyMessage,
    #[error("unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),
    #[error("payload too large: {0} bytes (max {MAX_MESSAGE_SIZE})")]
    PayloadTooLarge(usize),
    #[error("serialize error: {0}")]
    SerializeError(String),
    #[error("deserialize error: {0}")]
    DeserializeError(String),
}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::CreateRoom(m) => encode_message(MessageType::CreateRoom, m),
        ClientMessage::JoinRoom(m) => encode_message(MessageType::JoinRoom, m),
        ClientMessage::LeaveRoom(m) => encode_message(MessageType::LeaveRoom, m),
        ClientMessage::StartGame(m) => encode_message(MessageType::StartGame, m),
        ClientMessage::SubmitChat(m) => encode_message(MessageType::SubmitChat, m),
        ClientMessage::SubmitNightAction(m) => encode_message(MessageType::SubmitNightAction, m),
        ClientMessage::SubmitVote(m) => encode_message(MessageType::SubmitVote, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::RoomCreated(m) => encode_message(MessageType::RoomCreated, m),
        ServerMessage::RoomUpdate(m) => encode_message(MessageType::RoomUpdate, m),
        ServerMessage::PhaseChanged(m) => encode_message(MessageType::PhaseChanged, m),
        ServerMessage::RoleAssigned(m) => encode_message(MessageType::RoleAssigned, m),
        ServerMessage::InvestigationResult(m) => {
            encode_message(MessageType::InvestigationResult, m)
        },
        ServerMessage::ChatMessage(m) => encode_message(MessageType::ChatMessage, m),
        ServerMessage::ErrorMessage(m) => encode_message(MessageType::ErrorMessage, m),
        ServerMessage::GameOver(m) => encode_message(MessageType::GameOver, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`. Server-bound types are
/// rejected as unknown.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    if !msg_type.is_from_client() {
        return Err(ProtocolError::UnknownMessageType(msg_type as u8));
    }
    match msg_type {
        MessageType::CreateRoom => Ok(ClientMessage::CreateRoom(decode_payload::<
            CreateRoomMsg,
        >(data)?)),
        MessageType::JoinRoom => Ok(ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(
            data,
        )?)),
        MessageType::LeaveRoom => Ok(ClientMessage::LeaveRoom(decode_payload::<LeaveRoomMsg>(
            data,
        )?)),
        MessageType::StartGame => Ok(ClientMessage::StartGame(decode_payload::<StartGameMsg>(
            data,
        )?)),
        MessageType::SubmitChat => Ok(ClientMessage::SubmitChat(decode_payload::<
            SubmitChatMsg,
        >(data)?)),
        MessageType::SubmitNightAction => Ok(ClientMessage::SubmitNightAction(
            decode_payload::<SubmitNightActionMsg>(data)?,
        )),
        MessageType::SubmitVote => Ok(ClientMessage::SubmitVote(decode_payload::<
            SubmitVoteMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::RoomCreated => Ok(ServerMessage::RoomCreated(decode_payload::<
            RoomCreatedMsg,
        >(data)?)),
        MessageType::RoomUpdate => Ok(ServerMessage::RoomUpdate(decode_payload::<
            RoomUpdateMsg,
        >(data)?)),
        MessageType::PhaseChanged => Ok(ServerMessage::PhaseChanged(decode_payload::<
            PhaseChangedMsg,
        >(data)?)),
        MessageType::RoleAssigned => Ok(ServerMessage::RoleAssigned(decode_payload::<
            RoleAssignedMsg,
        >(data)?)),
        MessageType::InvestigationResult => Ok(ServerMessage::InvestigationResult(
            decode_payload::<InvestigationResultMsg>(data)?,
        )),
        MessageType::ChatMessage => Ok(ServerMessage::ChatMessage(decode_payload::<
            ChatMessageMsg,
        >(data)?)),
        MessageType::ErrorMessage => Ok(ServerMessage::ErrorMessage(decode_payload::<
            ErrorMessageMsg,
        >(data)?)),
        MessageType::GameOver => Ok(ServerMessage::GameOver(decode_payload::<GameOverMsg>(
            data,
        )?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
