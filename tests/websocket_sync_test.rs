// End-to-end tests over real WebSocket connections
//
// A server is bound on an ephemeral port and clients connect with
// tokio-tungstenite, exercising the /subscribe upgrade and both connection loops.

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use worldsync::{
    api::create_app,
    config::ServerConfig,
    session::{BroadcastFanout, SessionRegistry},
    state::WorldStore,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    store: Arc<WorldStore>,
    registry: Arc<SessionRegistry>,
}

async fn start_server() -> TestServer {
    let store = Arc::new(WorldStore::new());
    let registry = Arc::new(SessionRegistry::new());
    BroadcastFanout::attach(&store, Arc::clone(&registry));

    let app = create_app(
        Arc::clone(&store),
        Arc::clone(&registry),
        &ServerConfig::default(),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        store,
        registry,
    }
}

async fn connect(server: &TestServer) -> Client {
    let (client, _) = connect_async(format!("ws://{}/subscribe", server.addr))
        .await
        .unwrap();
    client
}

async fn recv_json(client: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for server message")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send_json(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

async fn wait_for_sessions(server: &TestServer, expected: usize) {
    for _ in 0..100 {
        if server.registry.len() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} sessions, found {}",
        expected,
        server.registry.len()
    );
}

#[tokio::test]
async fn test_clients_share_live_world() {
    let server = start_server().await;

    let mut a = connect(&server).await;
    assert_eq!(recv_json(&mut a).await, json!({}));
    let mut b = connect(&server).await;
    assert_eq!(recv_json(&mut b).await, json!({}));

    send_json(&mut a, json!({ "ball": { "x": 1 } })).await;
    assert_eq!(recv_json(&mut a).await, json!({ "ball": { "x": 1 } }));
    assert_eq!(recv_json(&mut b).await, json!({ "ball": { "x": 1 } }));

    server.store.update("ball", "y", json!(2)).unwrap();
    assert_eq!(recv_json(&mut a).await, json!({ "ball": { "x": 1, "y": 2 } }));
    assert_eq!(recv_json(&mut b).await, json!({ "ball": { "x": 1, "y": 2 } }));
}

#[tokio::test]
async fn test_late_joiner_receives_snapshot() {
    let server = start_server().await;

    let mut a = connect(&server).await;
    recv_json(&mut a).await;
    send_json(&mut a, json!({ "ball": { "x": 1 } })).await;
    send_json(&mut a, json!({ "box": { "w": 4 } })).await;
    recv_json(&mut a).await;
    recv_json(&mut a).await;

    let mut late = connect(&server).await;
    assert_eq!(
        recv_json(&mut late).await,
        json!({ "ball": { "x": 1 }, "box": { "w": 4 } })
    );
}

#[tokio::test]
async fn test_malformed_message_keeps_connection_open() {
    let server = start_server().await;

    let mut client = connect(&server).await;
    recv_json(&mut client).await;

    client
        .send(Message::Text("this is not json".to_string()))
        .await
        .unwrap();
    send_json(&mut client, json!({ "ball": { "ok": true } })).await;

    assert_eq!(
        recv_json(&mut client).await,
        json!({ "ball": { "ok": true } })
    );
    assert_eq!(server.registry.len(), 1);
}

#[tokio::test]
async fn test_disconnect_unregisters_session() {
    let server = start_server().await;

    let mut a = connect(&server).await;
    recv_json(&mut a).await;
    let mut b = connect(&server).await;
    recv_json(&mut b).await;
    wait_for_sessions(&server, 2).await;

    a.close(None).await.unwrap();
    wait_for_sessions(&server, 1).await;

    server.store.update("ball", "x", json!(1)).unwrap();
    assert_eq!(recv_json(&mut b).await, json!({ "ball": { "x": 1 } }));
}
