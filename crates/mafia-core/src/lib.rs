pub mod actions;
pub mod chat;
pub mod envelope;
pub mod error;
pub mod net;
pub mod phase;
pub mod player;
pub mod role;
pub mod room;
pub mod win;
