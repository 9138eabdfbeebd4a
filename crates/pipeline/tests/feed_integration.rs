//! Live feed listener against a local websocket server
//!
//! The server records the subscription frame, announces killmails, and
//! closes the connection so the listener has to reconnect.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::{Router, routing::get};
use chrono::Utc;
use killfeed_clock::ManualClock;
use killfeed_core::WorkItem;
use killfeed_pipeline::{Dispatcher, FeedConfig, FeedListener};
use killfeed_ports::QueueStore;
use killfeed_store::InMemoryQueue;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Default)]
struct FeedServer {
    connections: AtomicUsize,
    subscriptions: Mutex<Vec<String>>,
}

async fn upgrade(ws: WebSocketUpgrade, State(server): State<Arc<FeedServer>>) -> Response {
    ws.on_upgrade(move |socket| session(socket, server))
}

async fn session(mut socket: WebSocket, server: Arc<FeedServer>) {
    let connection = server.connections.fetch_add(1, Ordering::SeqCst) as u64;

    if let Some(Ok(Message::Text(text))) = socket.recv().await {
        server.subscriptions.lock().push(text.to_string());
    }

    let announcements = [
        format!(r#"{{"killID": {}, "hash": "h{}", "zkb": {{"totalValue": 1}}}}"#, 100 + connection, connection),
        r#"{"killID": 999}"#.to_string(),
        r#"{"action": "tqStatus", "tqStatus": "online"}"#.to_string(),
    ];
    for text in announcements {
        if socket.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn spawn_feed() -> (SocketAddr, Arc<FeedServer>) {
    let server = Arc::new(FeedServer::default());
    let app = Router::new()
        .route("/websocket/", get(upgrade))
        .with_state(server.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, server)
}

async fn wait_for(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_listener_subscribes_dispatches_and_reconnects() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (addr, server) = spawn_feed().await;

    let queue = Arc::new(InMemoryQueue::new());
    let dispatcher = Dispatcher::new(queue.clone(), ManualClock::new(Utc::now()));
    let config = FeedConfig {
        url: format!("ws://{}/websocket/", addr),
        channel: "killstream".to_string(),
        reconnect_delay: Duration::from_millis(20),
    };
    let listener = Arc::new(FeedListener::new(config, dispatcher));
    let (tx, rx) = watch::channel(false);

    let handle = {
        let listener = listener.clone();
        tokio::spawn(async move { listener.run(rx).await })
    };

    wait_for(|| listener.sessions() >= 2 && listener.dispatched() >= 2).await;
    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("listener stops on shutdown")
        .unwrap();

    let subscription: serde_json::Value =
        serde_json::from_str(&server.subscriptions.lock()[0]).unwrap();
    assert_eq!(subscription["action"], "sub");
    assert_eq!(subscription["channel"], "killstream");

    assert!(queue.score_of(&WorkItem::new(100, "h0")).is_some());
    assert!(queue.score_of(&WorkItem::new(101, "h1")).is_some());
    assert!(queue.score_of(&WorkItem::new(999, "")).is_none());
    assert_eq!(queue.len().await.unwrap(), listener.dispatched());
}

#[tokio::test]
async fn test_unreachable_feed_keeps_retrying_until_shutdown() {
    let config = FeedConfig {
        url: "ws://127.0.0.1:1/websocket/".to_string(),
        channel: "killstream".to_string(),
        reconnect_delay: Duration::from_millis(10),
    };
    let queue = Arc::new(InMemoryQueue::new());
    let listener = Arc::new(FeedListener::new(
        config,
        Dispatcher::new(queue, ManualClock::new(Utc::now())),
    ));
    let (tx, rx) = watch::channel(false);

    let handle = {
        let listener = listener.clone();
        tokio::spawn(async move { listener.run(rx).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());
    assert_eq!(listener.sessions(), 0);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("listener stops on shutdown")
        .unwrap();
}
