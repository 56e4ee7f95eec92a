//! End-to-end relay over real WebSocket connections

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use nexus_arena::app::AppState;
use nexus_arena::config::Config;
use nexus_arena::http::build_router;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(AppState::new(Config::default()));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("ws://{}/ws", addr)
}

async fn connect(url: &str) -> Client {
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

async fn send(client: &mut Client, msg: Value) {
    client.send(Message::Text(msg.to_string())).await.unwrap();
}

async fn recv(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for server message")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn recv_kind(client: &mut Client, kind: &str) -> Value {
    loop {
        let msg = recv(client).await;
        if msg["type"] == kind {
            return msg;
        }
    }
}

#[tokio::test]
async fn room_lifecycle_over_websocket() {
    let url = start_server().await;

    let mut host = connect(&url).await;
    send(
        &mut host,
        json!({ "type": "CREATE_ROOM", "playerName": "Alice", "team": "Blue Phantom" }),
    )
    .await;
    let created = recv(&mut host).await;
    assert_eq!(created["type"], "ROOM_CREATED");
    let code = created["roomCode"].as_str().unwrap().to_string();
    let host_id = created["playerId"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    // Garbage and unknown types are ignored without closing the socket
    host.send(Message::Text("{not json".into())).await.unwrap();
    send(&mut host, json!({ "type": "TELEPORT" })).await;

    let mut guest = connect(&url).await;
    send(
        &mut guest,
        json!({ "type": "JOIN_ROOM", "roomCode": code, "playerName": "Bob" }),
    )
    .await;
    let joined = recv(&mut guest).await;
    assert_eq!(joined["type"], "ROOM_JOINED");
    assert_eq!(joined["roomCode"], code.as_str());
    let guest_id = joined["playerId"].as_str().unwrap().to_string();

    let existing = recv(&mut guest).await;
    assert_eq!(existing["type"], "EXISTING_PLAYERS");
    let players = existing["players"].as_array().unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0]["name"], "Alice");
    assert_eq!(players[0]["team"], "Blue Phantom");

    let announced = recv(&mut host).await;
    assert_eq!(announced["type"], "PLAYER_JOINED");
    assert_eq!(announced["player"]["id"], guest_id.as_str());
    assert_eq!(announced["player"]["team"], "Red Phoenix");

    send(
        &mut guest,
        json!({ "type": "PLAYER_UPDATE", "position": { "x": 3.0, "y": 0.0, "z": -2.0 } }),
    )
    .await;
    let update = recv(&mut host).await;
    assert_eq!(update["type"], "PLAYER_UPDATE");
    assert_eq!(update["playerId"], guest_id.as_str());
    assert_eq!(update["position"]["x"], 3.0);

    send(&mut host, json!({ "type": "CHAT_MESSAGE", "message": "gl hf" })).await;
    let chat = recv_kind(&mut guest, "CHAT_MESSAGE").await;
    assert_eq!(chat["playerId"], host_id.as_str());
    assert_eq!(chat["playerName"], "Alice");
    assert_eq!(chat["message"], "gl hf");

    // Dropping the guest connection announces its departure
    drop(guest);
    let left = recv_kind(&mut host, "PLAYER_LEFT").await;
    assert_eq!(left["playerId"], guest_id.as_str());
}

#[tokio::test]
async fn fifth_player_is_turned_away() {
    let url = start_server().await;

    let mut host = connect(&url).await;
    send(&mut host, json!({ "type": "CREATE_ROOM" })).await;
    let code = recv(&mut host).await["roomCode"]
        .as_str()
        .unwrap()
        .to_string();

    let mut guests = Vec::new();
    for _ in 0..3 {
        let mut guest = connect(&url).await;
        send(&mut guest, json!({ "type": "JOIN_ROOM", "roomCode": code })).await;
        assert_eq!(recv(&mut guest).await["type"], "ROOM_JOINED");
        guests.push(guest);
    }

    let mut late = connect(&url).await;
    send(&mut late, json!({ "type": "JOIN_ROOM", "roomCode": code })).await;
    let refused = recv(&mut late).await;
    assert_eq!(refused["type"], "ERROR");
    assert_eq!(refused["message"], "Room is full (max 4 players)");

    send(&mut late, json!({ "type": "JOIN_ROOM", "roomCode": "ZZZZZZ" })).await;
    let missing = recv(&mut late).await;
    assert_eq!(missing["type"], "ERROR");
    assert_eq!(missing["message"], "Room not found");
}
