//! End-to-end push test: a real listener, a WebSocket observer and HTTP
//! mutations through reqwest.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use futures::StreamExt;
use queue_server::{Application, Config};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Observer = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn start(extra: &[(&str, &str)]) -> (SocketAddr, oneshot::Sender<()>) {
    let mut vars: HashMap<String, String> = [
        ("HOST", "127.0.0.1"),
        ("PORT", "0"),
        ("METRICS_ENABLED", "false"),
        ("QUEUE_SEED_AGENTS", "agent1:secret"),
        ("SHUTDOWN_TIMEOUT", "1"),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .collect();
    for (k, v) in extra {
        vars.insert((*k).to_string(), (*v).to_string());
    }
    let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("config");

    let app = Application::build(&config).await.expect("build application");
    let addr = app.local_addr().expect("local address");
    let (stop_tx, stop_rx) = oneshot::channel();
    tokio::spawn(app.run_until(async move {
        let _ = stop_rx.await;
    }));
    (addr, stop_tx)
}

async fn observe(addr: SocketAddr) -> Observer {
    let (stream, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("WebSocket connect");
    stream
}

async fn next_event(observer: &mut Observer) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), observer.next())
            .await
            .expect("event within timeout")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("JSON frame");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mutations_are_pushed_to_observers() {
    let (addr, stop) = start(&[]).await;
    let mut first = observe(addr).await;
    let mut second = observe(addr).await;
    let http = reqwest::Client::new();
    let base = format!("http://{addr}/api");

    let registered: Value = http
        .post(format!("{base}/client/register"))
        .json(&json!({"customer_name": "Ada Lovelace"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(registered["ticket_number"], 1);

    for observer in [&mut first, &mut second] {
        assert_eq!(
            next_event(observer).await,
            json!({
                "event": "queue-update",
                "data": {"ticket_number": 1, "customer_name": "Ada Lovelace", "status": "waiting"}
            })
        );
    }

    let login = http
        .post(format!("{base}/agent/login"))
        .json(&json!({"name": "agent1", "password": "secret"}))
        .send()
        .await
        .unwrap();
    assert!(login.status().is_success());

    let call = http
        .post(format!("{base}/agent/call"))
        .json(&json!({"ticket_number": 1, "agent_name": "agent1"}))
        .send()
        .await
        .unwrap();
    assert!(call.status().is_success());

    assert_eq!(
        next_event(&mut first).await,
        json!({
            "event": "queue-update",
            "data": {"ticket_number": 1, "agent_name": "agent1", "status": "in_service"}
        })
    );
    assert_eq!(
        next_event(&mut first).await,
        json!({
            "event": "agent-status-update",
            "data": {"name": "agent1", "status": "busy"}
        })
    );

    let _ = stop.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connection_limit_rejects_extra_observers() {
    let (addr, stop) = start(&[("WS_MAX_CONNECTIONS", "1")]).await;
    let _held = observe(addr).await;

    let rejected = connect_async(format!("ws://{addr}/ws")).await;

    match rejected {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 503);
        }
        Err(other) => unreachable!("expected HTTP 503, got {other}"),
        Ok(_) => unreachable!("connection beyond the limit was accepted"),
    }

    let _ = stop.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_over_a_real_socket() {
    let (addr, stop) = start(&[]).await;

    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    let _ = stop.send(());
}
