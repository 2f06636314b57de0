use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use mafia_core::net::messages::{
    ClientMessage, CreateRoomMsg, JoinRoomMsg, RoomUpdateMsg, ServerMessage, StartGameMsg,
};
use mafia_core::net::protocol::{decode_server_message, encode_client_message};
use mafia_core::player::PlayerId;
use mafia_core::role::Role;

use mafia_server::build_app;
use mafia_server::config::{GameConfig, ServerConfig};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default phase durations.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Start a test server with short phases.
    pub async fn with_phases(night_ms: u64, day_ms: u64) -> Self {
        let config = ServerConfig {
            game: GameConfig {
                night_duration_ms: night_ms,
                day_duration_ms: day_ms,
                ..GameConfig::default()
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a ClientMessage from a WS stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    ws_try_read_server_msg(stream, 5_000)
        .await
        .expect("Timed out waiting for WebSocket message")
}

/// Try to read the next ServerMessage, returning None on timeout.
pub async fn ws_try_read_server_msg(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerMessage> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return decode_server_message(&data).unwrap(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read messages until one matches `pred`. Returns everything read, the
/// match last. Panics after 5s without a match.
pub async fn read_until(
    stream: &mut WsStream,
    pred: impl Fn(&ServerMessage) -> bool,
) -> Vec<ServerMessage> {
    let mut seen = Vec::new();
    loop {
        let msg = ws_try_read_server_msg(stream, 5_000)
            .await
            .unwrap_or_else(|| panic!("No matching message; saw {seen:?}"));
        let done = pred(&msg);
        seen.push(msg);
        if done {
            return seen;
        }
    }
}

/// Read until the next RoomUpdate and return it.
pub async fn read_room_update(stream: &mut WsStream) -> RoomUpdateMsg {
    let seen = read_until(stream, |m| matches!(m, ServerMessage::RoomUpdate(_))).await;
    match seen.into_iter().last() {
        Some(ServerMessage::RoomUpdate(update)) => update,
        other => panic!("Expected RoomUpdate, got: {other:?}"),
    }
}

/// Create a room. Consumes the RoomCreated reply and the first RoomUpdate,
/// returning the code and that update.
pub async fn ws_create_room(stream: &mut WsStream, name: &str) -> (String, RoomUpdateMsg) {
    let msg = ClientMessage::CreateRoom(CreateRoomMsg {
        display_name: name.to_string(),
    });
    ws_send_client_msg(stream, &msg).await;

    let code = match ws_read_server_msg(stream).await {
        ServerMessage::RoomCreated(created) => created.code,
        other => panic!("Expected RoomCreated, got: {other:?}"),
    };
    let update = read_room_update(stream).await;
    assert_eq!(update.code, code);
    (code, update)
}

/// Send a JoinRoom message without reading the reply.
pub async fn ws_send_join(stream: &mut WsStream, code: &str, name: &str) {
    let msg = ClientMessage::JoinRoom(JoinRoomMsg {
        code: code.to_string(),
        display_name: name.to_string(),
    });
    ws_send_client_msg(stream, &msg).await;
}

/// Join a room and return the RoomUpdate that confirms it.
pub async fn ws_join_room(stream: &mut WsStream, code: &str, name: &str) -> RoomUpdateMsg {
    ws_send_join(stream, code, name).await;
    read_room_update(stream).await
}

/// Expect the next message to be an ErrorMessage and return its text.
pub async fn ws_expect_error(stream: &mut WsStream) -> String {
    match ws_read_server_msg(stream).await {
        ServerMessage::ErrorMessage(err) => err.text,
        other => panic!("Expected ErrorMessage, got: {other:?}"),
    }
}

/// One seated client.
pub struct Seat {
    pub id: PlayerId,
    pub name: String,
    pub stream: WsStream,
}

/// Open `n` connections, create a room from the first and join the rest.
/// Every client's pending RoomUpdates are drained once all have joined.
pub async fn ws_fill_room(server: &TestServer, n: usize) -> (String, Vec<Seat>) {
    let mut host = ws_connect(&server.ws_url()).await;
    let (code, first) = ws_create_room(&mut host, "Host").await;
    let mut streams = vec![("Host".to_string(), host, first)];

    for i in 1..n {
        let name = format!("Guest{i}");
        let mut stream = ws_connect(&server.ws_url()).await;
        let first = ws_join_room(&mut stream, &code, &name).await;
        streams.push((name, stream, first));
    }

    let mut seats = Vec::new();
    for (name, mut stream, mut update) in streams {
        // the last RoomUpdate each client sees lists all `n` players
        while update.players.len() < n {
            update = read_room_update(&mut stream).await;
        }
        let id = update
            .players
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
            .unwrap();
        seats.push(Seat { id, name, stream });
    }
    (code, seats)
}

/// Start the game from the host seat and return each seat's role, in seat
/// order, as told by its RoleAssigned message.
pub async fn ws_start_game(seats: &mut [Seat]) -> Vec<Role> {
    ws_send_client_msg(&mut seats[0].stream, &ClientMessage::StartGame(StartGameMsg {})).await;
    let mut roles = Vec::new();
    for seat in seats.iter_mut() {
        let seen = read_until(&mut seat.stream, |m| {
            matches!(m, ServerMessage::RoleAssigned(_))
        })
        .await;
        match seen.last() {
            Some(ServerMessage::RoleAssigned(r)) => roles.push(r.role),
            other => panic!("Expected RoleAssigned, got: {other:?}"),
        }
    }
    roles
}
