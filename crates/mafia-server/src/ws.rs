use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use mafia_core::net::messages::ClientMessage;
use mafia_core::net::protocol::{MAX_MESSAGE_SIZE, decode_client_message};
use mafia_core::player::PlayerId;

use crate::phase_timer;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (ws_sender, mut ws_receiver) = socket.split();

    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);
    let player_id = state.rooms.write().await.connect(tx);
    tracing::info!(player_id, "Client connected");

    spawn_writer(ws_sender, rx);
    read_loop(&mut ws_receiver, &state, player_id).await;

    // Disconnect takes the same path as an explicit leave.
    state.rooms.write().await.disconnect(player_id);
    tracing::info!(player_id, "Client disconnected");
}

fn spawn_writer(mut ws_sender: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Bytes>) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    player_id: PlayerId,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if !rate_limiter.allow() {
            tracing::warn!(player_id, "Rate limited");
            continue;
        }

        // Malformed frames are dropped; they never reach a room.
        let client_msg = match decode_client_message(&data) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(player_id, error = %e, "Dropping undecodable message");
                continue;
            },
        };

        handle_client_message(state, player_id, client_msg).await;
    }
}

/// Apply one request under the room manager's write lock. Rejections are
/// reported to the sender only.
async fn handle_client_message(state: &AppState, player_id: PlayerId, msg: ClientMessage) {
    let mut rooms = state.rooms.write().await;

    let result = match msg {
        ClientMessage::CreateRoom(m) => rooms.create_room(player_id, &m.display_name).map(drop),
        ClientMessage::JoinRoom(m) => rooms.join_room(player_id, &m.code, &m.display_name),
        ClientMessage::LeaveRoom(_) => {
            rooms.leave_room(player_id);
            Ok(())
        },
        ClientMessage::StartGame(_) => rooms.start_game(player_id).map(|deadline| {
            if let Some(deadline) = deadline {
                phase_timer::arm(&state.rooms, &mut rooms, deadline);
            }
        }),
        ClientMessage::SubmitChat(m) => rooms.submit_chat(player_id, &m.text),
        ClientMessage::SubmitNightAction(m) => rooms.submit_night_action(player_id, m.target_id),
        ClientMessage::SubmitVote(m) => rooms.submit_vote(player_id, m.target_id),
    };

    if let Err(e) = result {
        tracing::debug!(
            player_id,
            room = rooms.room_of(player_id).unwrap_or("-"),
            kind = ?e.kind(),
            error = %e,
            "Request rejected"
        );
        rooms.send_error(player_id, &e);
    }
}
