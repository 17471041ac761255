#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use futures::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use voicechat_api::config::ServerConfig;
use voicechat_api::router::build_app_router;
use voicechat_api::state::AppState;

/// Build a test `ServerConfig` from defaults plus the given overrides.
pub fn test_config(vars: &[(&str, &str)]) -> ServerConfig {
    let mut map: HashMap<String, String> = HashMap::new();
    map.insert("HOST".into(), "127.0.0.1".into());
    map.insert("PORT".into(), "0".into());
    for (k, v) in vars {
        map.insert(k.to_string(), v.to_string());
    }
    ServerConfig::from_lookup(|key| map.get(key).cloned()).expect("test config must be valid")
}

/// Build fresh state and the full application router (same middleware stack
/// as production).
pub fn build_test_app(vars: &[(&str, &str)]) -> (Router, AppState) {
    let state = AppState::new(test_config(vars));
    (build_app_router(state.clone()), state)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Live server + WebSocket client helpers
// ---------------------------------------------------------------------------

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve the app on an ephemeral local port.
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let app = build_app_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Connect a client and consume the `connected` greeting, returning the
/// client and its connection id.
pub async fn connect(addr: SocketAddr) -> (Client, String) {
    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("WebSocket handshake failed");
    let greeting = next_event(&mut client).await;
    assert_eq!(greeting["event"], "connected");
    let sid = greeting["data"]["sid"].as_str().unwrap().to_string();
    (client, sid)
}

pub async fn send(client: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    client.send(Message::Text(frame)).await.unwrap();
}

/// Next JSON event, skipping control frames. Panics after two seconds.
pub async fn next_event(client: &mut Client) -> Value {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended unexpectedly: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for an event")
}

/// Wait for the next event with the given name, skipping others.
pub async fn expect_event(client: &mut Client, name: &str) -> Value {
    loop {
        let event = next_event(client).await;
        if event["event"] == name {
            return event;
        }
    }
}

/// Assert no text event arrives within a short window.
pub async fn assert_silent(client: &mut Client) {
    let outcome = tokio::time::timeout(Duration::from_millis(200), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                _ => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    assert!(outcome.is_err(), "unexpected event: {outcome:?}");
}
