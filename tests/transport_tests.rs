//! WebSocket channel and HTTP history store against a small in-process
//! room broadcaster.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{
        Path,
        ws::{Message as WsFrame, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use roomchat::{
    Identity, Session, SessionEvent, SessionState, SessionUpdate,
    channel::{InboundEvent, WsChannel},
    history::{HistoryStore, HttpHistoryStore, load_history},
    store::MemoryStore,
};
use serde_json::json;
use time::macros::datetime;
use tokio::sync::mpsc;

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/ws", get(room_ws))
        .route("/rooms/{room_code}/messages", get(room_history));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn room_ws(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(broadcast)
}

/// Answers like a one-member room: notices on join/leave, echoes sends.
async fn broadcast(mut socket: WebSocket) {
    while let Some(Ok(frame)) = socket.recv().await {
        let WsFrame::Text(text) = frame else {
            continue;
        };
        let Ok(event) = serde_json::from_str::<serde_json::Value>(text.as_str()) else {
            continue;
        };
        let data = &event["data"];
        let name = data["name"].as_str().unwrap_or("?").to_owned();

        let replies = match event["event"].as_str() {
            Some("join") => vec![
                json!({"event": "presence", "data": {"members": [name]}}),
                json!({"event": "message", "data": {"name": "System", "msg": format!("{name} joined the room")}}),
            ],
            Some("send_message") => vec![json!({
                "event": "message",
                "data": {"name": name, "msg": data["message"], "timestamp": "12:30:00"},
            })],
            Some("leave") => {
                let notice = json!({"event": "message", "data": {"name": "System", "msg": format!("{name} left the room")}});
                let _ = socket.send(WsFrame::Text(notice.to_string().into())).await;
                let _ = socket.send(WsFrame::Close(None)).await;
                return;
            }
            _ => continue,
        };

        for reply in replies {
            if socket.send(WsFrame::Text(reply.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}

async fn room_history(Path(room_code): Path<String>) -> Response {
    match room_code.as_str() {
        "BROKEN" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "GARBLED" => "<html>not json</html>".into_response(),
        "A#1" => Json(json!({"messages": [{"name": "C", "msg": "hash room", "timestamp": "09:00:00"}]})).into_response(),
        _ => Json(json!({
            "messages": [
                {"name": "A", "msg": "hi", "timestamp": "10:00:00"},
                {"name": "B", "msg": "yo", "timestamp": "10:00:05"},
            ]
        }))
        .into_response(),
    }
}

async fn next_event(inbound: &mut mpsc::UnboundedReceiver<InboundEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .expect("timed out waiting for the broadcaster")
        .expect("inbound queue closed")
        .into()
}

fn alice() -> Identity {
    Identity {
        user_id: "user_alice".into(),
        display_name: "Alice".into(),
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[tokio::test]
async fn http_history_is_fetched_in_order() {
    let addr = spawn_server().await;
    let history = HttpHistoryStore::new(format!("http://{addr}/"));

    let messages = history
        .fetch_at("AB12CD", datetime!(2026-10-19 12:00:00 UTC))
        .await
        .unwrap();
    let names: Vec<&str> = messages.iter().map(|m| m.sender_name.as_str()).collect();
    assert_eq!(names, ["A", "B"]);
    assert_eq!(messages[0].timestamp, datetime!(2026-10-19 10:00:00 UTC));
    assert_eq!(messages[1].timestamp, datetime!(2026-10-19 10:00:05 UTC));
}

#[tokio::test]
async fn room_code_is_sent_as_one_path_segment() {
    let addr = spawn_server().await;
    let history = HttpHistoryStore::new(format!("http://{addr}"));

    let messages = history.fetch("A#1").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "hash room");
}

#[tokio::test]
async fn failed_history_reads_as_empty() {
    let addr = spawn_server().await;
    let history = HttpHistoryStore::new(format!("http://{addr}"));

    assert!(history.fetch("BROKEN").await.is_err());
    assert!(load_history(&history, "BROKEN").await.is_empty());
    assert!(load_history(&history, "GARBLED").await.is_empty());

    let nowhere = HttpHistoryStore::new("http://127.0.0.1:9");
    assert!(load_history(&nowhere, "AB12CD").await.is_empty());
}

// ---------------------------------------------------------------------------
// Live channel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_send_leave_over_websocket() {
    let addr = spawn_server().await;
    let (channel, mut inbound) = WsChannel::connect(&format!("ws://{addr}/ws")).await.unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut session = Session::new(alice(), channel, store);

    session.join_room("AB12CD").await.unwrap();
    assert_eq!(session.state(), SessionState::Joining);

    let SessionUpdate::Appended(notice) = session.handle(next_event(&mut inbound).await) else {
        panic!("expected the join notice");
    };
    assert_eq!(notice.message.body, "Alice joined the room");
    assert!(session.is_joined());

    session.send_message("  hi  ").unwrap();
    let SessionUpdate::Appended(echo) = session.handle(next_event(&mut inbound).await) else {
        panic!("expected the echoed message");
    };
    assert_eq!(echo.message.body, "hi");
    assert!(echo.own);

    session.leave_room().await.unwrap();
    assert!(!session.is_joined());

    let SessionUpdate::Appended(left) = session.handle(next_event(&mut inbound).await) else {
        panic!("expected the leave notice");
    };
    assert_eq!(left.message.body, "Alice left the room");
    assert_eq!(session.handle(next_event(&mut inbound).await), SessionUpdate::Disconnected);
    assert_eq!(session.timeline().len(), 3);

    session.into_channel().shutdown().await;
}

#[tokio::test]
async fn history_and_live_share_one_timeline() {
    let addr = spawn_server().await;
    let (channel, mut inbound) = WsChannel::connect(&format!("ws://{addr}/ws")).await.unwrap();
    let history = HttpHistoryStore::new(format!("http://{addr}"));
    let mut session = Session::new(alice(), channel, Arc::new(MemoryStore::new()));

    session.join_room("AB12CD").await.unwrap();
    let room_code = session.history_request().unwrap();

    // the join notice carries no stamp, so it lands where it was received
    let notice = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .unwrap()
        .unwrap();
    session.handle(SessionEvent::from_inbound(notice, datetime!(2026-10-19 10:00:02 UTC)));

    let messages = history
        .fetch_at(&room_code, datetime!(2026-10-19 12:00:00 UTC))
        .await
        .unwrap();
    session.handle(SessionEvent::HistoryLoaded { room_code, messages });

    let bodies: Vec<&str> = session.timeline().iter().map(|e| e.message.body.as_str()).collect();
    assert_eq!(bodies, ["hi", "Alice joined the room", "yo"]);
    assert!(session.history_request().is_none());

    session.leave_room().await.unwrap();
    session.into_channel().shutdown().await;
}

#[tokio::test]
async fn server_going_away_is_reported() {
    let addr = spawn_server().await;
    let (channel, mut inbound) = WsChannel::connect(&format!("ws://{addr}/ws")).await.unwrap();
    let mut session = Session::new(alice(), channel, Arc::new(MemoryStore::new()));

    session.join_room("AB12CD").await.unwrap();
    session.handle(next_event(&mut inbound).await);

    // leave makes the fake broadcaster hang up; drain until it does
    session.leave_room().await.unwrap();
    loop {
        if session.handle(next_event(&mut inbound).await) == SessionUpdate::Disconnected {
            break;
        }
    }
    assert_eq!(session.state(), SessionState::Unjoined);
}

#[tokio::test]
async fn connecting_to_nothing_fails() {
    assert!(WsChannel::connect("ws://127.0.0.1:9/ws").await.is_err());
}
