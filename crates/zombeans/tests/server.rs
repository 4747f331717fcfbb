//! End-to-end tests: real WebSocket clients against a running server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;
use zombeans::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    addr: String,
    directory: std::sync::Arc<Directory>,
}

/// Starts a server on a random port.
async fn start_server(room: RoomConfig) -> TestServer {
    let server = ZombeansServer::builder()
        .bind("127.0.0.1:0")
        .room_config(room)
        .build()
        .await
        .expect("server should build");

    let addr = server.local_addr().expect("should have local addr").to_string();
    let directory = server.directory();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    TestServer { addr, directory }
}

fn room_config() -> RoomConfig {
    RoomConfig {
        min_players: 3,
        max_players: 4,
        ..RoomConfig::default()
    }
}

async fn connect(addr: &str, path: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

/// Next JSON message, or `None` if the socket closed.
async fn recv(ws: &mut ClientWs) -> Option<Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(3), ws.next())
            .await
            .expect("timed out waiting for a message")?;
        match msg {
            Ok(Message::Binary(data)) => return Some(serde_json::from_slice(&data).expect("json")),
            Ok(Message::Text(text)) => return Some(serde_json::from_str(text.as_str()).expect("json")),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

async fn recv_json(ws: &mut ClientWs) -> Value {
    recv(ws).await.expect("socket closed")
}

/// Skips messages until one of type `ty` arrives.
async fn recv_type(ws: &mut ClientWs, ty: &str) -> Value {
    loop {
        let msg = recv_json(ws).await;
        if msg["type"] == ty {
            return msg;
        }
    }
}

async fn owner(addr: &str) -> (ClientWs, String) {
    let mut ws = connect(addr, "/owner").await;
    let msg = recv_json(&mut ws).await;
    assert_eq!(msg["type"], "room_code");
    let code = msg["code"].as_str().expect("code").to_string();
    (ws, code)
}

async fn player(addr: &str, code: &str, name: &str) -> (ClientWs, Value) {
    let mut ws = connect(addr, "/player").await;
    send(
        &mut ws,
        json!({"type": "join_request", "room_code": code, "display_name": name}),
    )
    .await;
    let resp = recv_json(&mut ws).await;
    (ws, resp)
}

async fn viewer(addr: &str, code: &str) -> (ClientWs, Value) {
    let mut ws = connect(addr, "/viewer").await;
    send(&mut ws, json!({"type": "view_request", "room_code": code})).await;
    let resp = recv_json(&mut ws).await;
    (ws, resp)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_owner_receives_room_code() {
    let server = start_server(room_config()).await;
    let (_ws, code) = owner(&server.addr).await;
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|b| b.is_ascii_uppercase()));
    assert_eq!(server.directory.room_count().await, 1);
}

#[tokio::test]
async fn test_host_path_is_owner_alias() {
    let server = start_server(room_config()).await;
    let mut ws = connect(&server.addr, "/host").await;
    assert_eq!(recv_json(&mut ws).await["type"], "room_code");
}

#[tokio::test]
async fn test_unknown_path_is_closed() {
    let server = start_server(room_config()).await;
    let mut ws = connect(&server.addr, "/admin").await;
    assert!(recv(&mut ws).await.is_none());
}

#[tokio::test]
async fn test_join_flow_and_player_joined() {
    let server = start_server(room_config()).await;
    let (mut owner_ws, code) = owner(&server.addr).await;

    let (_a, resp) = player(&server.addr, &code.to_lowercase(), "ana").await;
    assert_eq!(resp["type"], "join_response");
    assert_eq!(resp["status"], "success");
    assert_eq!(resp["slot"], 0);
    assert_eq!(resp["is_controller"], false);

    let (_b, resp) = player(&server.addr, &code, "bo").await;
    assert_eq!(resp["slot"], 1);
    assert_eq!(resp["is_controller"], true);

    let first = recv_json(&mut owner_ws).await;
    assert_eq!(first["type"], "player_joined");
    assert_eq!(first["new_player_name"], "ana");
    let second = recv_json(&mut owner_ws).await;
    assert_eq!(second["new_player_name"], "bo");
    assert_eq!(second["roster"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_join_unknown_room_fails_without_disconnect() {
    let server = start_server(room_config()).await;
    let (mut ws, resp) = player(&server.addr, "NOROOM", "ana").await;
    assert_eq!(resp["status"], "failure");
    assert!(resp["reason"].as_str().unwrap().contains("not found"));

    // Still connected: a second attempt gets a second answer.
    send(
        &mut ws,
        json!({"type": "join_request", "room_code": "NOROOM", "display_name": "ana"}),
    )
    .await;
    assert_eq!(recv_json(&mut ws).await["status"], "failure");
}

#[tokio::test]
async fn test_undecodable_frames_are_skipped() {
    let server = start_server(room_config()).await;
    let (_owner, code) = owner(&server.addr).await;

    let mut ws = connect(&server.addr, "/player").await;
    ws.send(Message::Text("not json".to_string().into())).await.expect("send");
    // A viewer request on a player connection doesn't decode either.
    send(&mut ws, json!({"type": "view_request", "room_code": code})).await;
    send(
        &mut ws,
        json!({"type": "join_request", "room_code": code, "display_name": "ana"}),
    )
    .await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["type"], "join_response");
    assert_eq!(resp["status"], "success");
}

#[tokio::test]
async fn test_start_below_minimum_is_rejected() {
    let server = start_server(room_config()).await;
    let (mut owner_ws, code) = owner(&server.addr).await;
    let (_a, _) = player(&server.addr, &code, "ana").await;
    let _ = recv_json(&mut owner_ws).await;

    send(&mut owner_ws, json!({"type": "start_game"})).await;
    let msg = recv_json(&mut owner_ws).await;
    assert_eq!(msg["type"], "start_rejected");
    assert_eq!(
        server.directory.room_state(&RoomCode::new(&code)).await,
        Some(RoomState::Lobby)
    );
}

#[tokio::test]
async fn test_viewer_sees_game_and_owner_leaving_ends_it() {
    let server = start_server(room_config()).await;
    let (mut owner_ws, code) = owner(&server.addr).await;

    let mut players = Vec::new();
    for name in ["ana", "bo", "cy"] {
        let (ws, resp) = player(&server.addr, &code, name).await;
        assert_eq!(resp["status"], "success");
        players.push(ws);
    }
    let (mut viewer_a, resp) = viewer(&server.addr, &code).await;
    assert_eq!(resp["type"], "view_response");
    assert_eq!(resp["status"], "success");
    assert_eq!(resp["roster"].as_array().unwrap().len(), 3);
    assert_eq!(resp["arena"]["width"], 800.0);
    let (mut viewer_b, _) = viewer(&server.addr, &code).await;

    send(&mut owner_ws, json!({"type": "start_game"})).await;

    let starting = recv_type(&mut viewer_a, "game_starting").await;
    assert_eq!(starting["arena"]["entity_radius"], 25.0);
    for ws in &mut players {
        recv_type(ws, "game_starting").await;
    }

    let tick = recv_type(&mut viewer_a, "tick").await;
    let per_slot = tick["per_slot"].as_object().unwrap();
    assert_eq!(per_slot.len(), 3);
    assert_eq!(per_slot["0"]["infected"], true);
    assert_eq!(per_slot["2"]["infected"], false);

    // The controller gets its ability timers every tick.
    let state = recv_type(&mut players[1], "ability_state").await;
    assert_eq!(state["available"].as_array().unwrap().len(), 4);

    // Movement reaches the simulation.
    let before = tick["per_slot"]["2"]["position"]["x"].as_f64().unwrap();
    send(
        &mut players[2],
        json!({"type": "move", "direction": "left", "pressed": true}),
    )
    .await;
    let mut moved = false;
    for _ in 0..500 {
        let later = recv_type(&mut viewer_a, "tick").await;
        if later["per_slot"]["2"]["position"]["x"].as_f64().unwrap() < before {
            moved = true;
            break;
        }
    }
    assert!(moved, "slot 2 never moved left");

    owner_ws.close(None).await.expect("close");

    for ws in players.iter_mut().chain([&mut viewer_a, &mut viewer_b]) {
        let over = recv_type(ws, "game_over").await;
        assert_eq!(over["reason"], "session_ended");
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.directory.room_count().await, 0);

    // The code no longer resolves.
    let (_late, resp) = player(&server.addr, &code, "late").await;
    assert_eq!(resp["status"], "failure");
}

#[tokio::test]
async fn test_short_game_ends_with_survivors_win() {
    let room = RoomConfig {
        sim: SimConfig {
            max_ticks: 20,
            ..SimConfig::default()
        },
        ..room_config()
    };
    let server = start_server(room).await;
    let (mut owner_ws, code) = owner(&server.addr).await;
    let mut players = Vec::new();
    for name in ["ana", "bo", "cy"] {
        players.push(player(&server.addr, &code, name).await.0);
    }
    let (mut viewer_ws, _) = viewer(&server.addr, &code).await;

    send(&mut owner_ws, json!({"type": "start_game"})).await;

    let over = recv_type(&mut viewer_ws, "game_over").await;
    assert_eq!(over["reason"], "survivors_win");
    for ws in &mut players {
        assert_eq!(recv_type(ws, "game_over").await["reason"], "survivors_win");
    }
    assert_eq!(
        server.directory.room_state(&RoomCode::new(&code)).await,
        Some(RoomState::Finished)
    );

    // Nothing after game_over.
    let quiet = tokio::time::timeout(Duration::from_millis(200), viewer_ws.next()).await;
    assert!(quiet.is_err(), "unexpected message after game_over");
}
