// tests/integration/web_test.rs

//! The web listener: landing page and the `/websocket` event channel.

use super::test_helpers::{ALICE, SELF_ID, TestServer};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn http_get(server: &TestServer, path: &str) -> String {
    let mut stream = TcpStream::connect(server.web_addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
        .await
        .expect("response in time")
        .unwrap();
    response
}

async fn open_channel(server: &TestServer) -> Client {
    let url = format!("ws://{}/websocket", server.web_addr);
    let (ws, _) = connect_async(url).await.expect("websocket handshake");
    ws
}

async fn send_frame(ws: &mut Client, frame: &str) {
    ws.send(Message::Text(frame.into())).await.unwrap();
}

async fn recv_frame(ws: &mut Client) -> serde_json::Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame in time")
            .expect("channel open")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_landing_page_on_root() {
    let server = TestServer::start().await;

    let response = http_get(&server, "/").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("<center><h1>Hi there</h1></center>"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_landing_page_on_any_path() {
    let server = TestServer::start().await;

    let response = http_get(&server, "/some/where?x=1").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("Hi there"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_line_event_round_trip() {
    let server = TestServer::start().await;
    let mut ws = open_channel(&server).await;

    send_frame(&mut ws, r#"["line", ["WHOAMI"]]"#).await;
    assert_eq!(
        recv_frame(&mut ws).await,
        serde_json::json!(["line", [format!("WHOAMI {SELF_ID}")]])
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_command_event_joins_arguments() {
    let server = TestServer::start().await;
    let mut ws = open_channel(&server).await;

    send_frame(&mut ws, &format!(r#"["command", ["STATUS", "{ALICE}"]]"#)).await;
    assert_eq!(
        recv_frame(&mut ws).await,
        serde_json::json!(["line", [format!("{ALICE} STATUS offline")]])
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_event_channel_needs_authorization() {
    let mut config = TestServer::config();
    config.password = Some("secret".to_string());
    let server = TestServer::with_config(config).await;
    let mut ws = open_channel(&server).await;

    send_frame(&mut ws, r#"["line", ["LIST"]]"#).await;
    assert_eq!(
        recv_frame(&mut ws).await,
        serde_json::json!(["line", ["UNAUTHORIZED LIST"]])
    );

    send_frame(&mut ws, r#"["command", ["PASS", "secret"]]"#).await;
    let authorized = recv_frame(&mut ws).await;
    assert!(authorized[1][0].as_str().unwrap().starts_with("AUTHORIZED "));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_malformed_and_reserved_frames_are_ignored() {
    let server = TestServer::start().await;
    let mut ws = open_channel(&server).await;

    send_frame(&mut ws, "not json").await;
    send_frame(&mut ws, r#"{"line": "WHOAMI"}"#).await;
    send_frame(&mut ws, r#"["close", []]"#).await;
    send_frame(&mut ws, r#"["nobody-listens", [1, 2]]"#).await;
    send_frame(&mut ws, r#"["line", ["WHOAMI"]]"#).await;

    // The channel survived all of the above and is still registered.
    assert_eq!(
        recv_frame(&mut ws).await,
        serde_json::json!(["line", [format!("WHOAMI {SELF_ID}")]])
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_line_and_event_channel_share_events() {
    let server = TestServer::start().await;
    let mut ws = open_channel(&server).await;
    let mut line_client = server.connect().await;

    // Make sure the channel is registered before the announcement goes out.
    send_frame(&mut ws, r#"["line", ["WHOAMI"]]"#).await;
    recv_frame(&mut ws).await;

    line_client.send(&format!("GROUPCHAT_INVITE {ALICE}")).await;
    assert_eq!(
        recv_frame(&mut ws).await,
        serde_json::json!(["line", [format!("GROUPCHAT_CREATE {SELF_ID}-1")]])
    );

    server.stop().await.unwrap();
}
