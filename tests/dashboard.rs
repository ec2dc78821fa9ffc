//! Dashboard WebSocket tests: catch-up, retargeting, live events.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

mod common;

use common::{http_client, start_mock_backend, start_monitor, target_for, MockResponse};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(url: &str) -> Socket {
    let (socket, _) = connect_async(url).await.expect("dashboard unreachable");
    socket
}

/// Next JSON event, failing after two seconds.
async fn next_event(socket: &mut Socket) -> Value {
    let wait = async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<Value>(text.as_str()).unwrap()
                }
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {other:?}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .expect("timed out waiting for an event")
}

/// Next event with the given name, skipping everything else.
async fn next_named(socket: &mut Socket, name: &str) -> Value {
    loop {
        let event = next_event(socket).await;
        if event["event"] == name {
            return event;
        }
    }
}

async fn send_update(socket: &mut Socket, hostname: &str, port: Value) {
    let command = json!({"event": "updateConfig", "data": {"hostname": hostname, "port": port}});
    socket
        .send(Message::Text(command.to_string().into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_catch_up_on_connect() {
    let backend = start_mock_backend(MockResponse::ok("")).await;
    let monitor = start_monitor(target_for(backend)).await;
    let mut socket = connect(&monitor.dashboard_ws()).await;

    let stats = next_event(&mut socket).await;
    assert_eq!(stats["event"], "stats");
    assert_eq!(stats["data"]["totalRequests"], 0);
    assert_eq!(stats["data"]["statusCodes"]["byClass"]["2xx"], 0);

    let config = next_event(&mut socket).await;
    assert_eq!(
        config,
        json!({"event": "configUpdated", "data": {"host": "127.0.0.1", "port": backend.port()}})
    );

    monitor.shutdown.trigger();
}

#[tokio::test]
async fn test_update_config_reaches_every_subscriber() {
    let first = start_mock_backend(MockResponse::ok("first")).await;
    let second = start_mock_backend(MockResponse::ok("second")).await;
    let monitor = start_monitor(target_for(first)).await;

    let mut sender = connect(&monitor.dashboard_ws()).await;
    let mut observer = connect(&monitor.dashboard_ws()).await;
    next_named(&mut sender, "configUpdated").await;
    next_named(&mut observer, "configUpdated").await;

    send_update(&mut sender, "127.0.0.1", json!(second.port().to_string())).await;

    let expected = json!({"host": "127.0.0.1", "port": second.port()});
    assert_eq!(next_named(&mut sender, "configUpdated").await["data"], expected);
    assert_eq!(next_named(&mut observer, "configUpdated").await["data"], expected);

    assert_eq!(*monitor.engine.target(), target_for(second));
    let body = http_client()
        .get(monitor.proxy_url("/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "second");

    monitor.shutdown.trigger();
}

#[tokio::test]
async fn test_invalid_port_is_rejected_privately() {
    let backend = start_mock_backend(MockResponse::ok("")).await;
    let monitor = start_monitor(target_for(backend)).await;

    let mut sender = connect(&monitor.dashboard_ws()).await;
    let mut observer = connect(&monitor.dashboard_ws()).await;
    next_named(&mut sender, "configUpdated").await;
    next_named(&mut observer, "configUpdated").await;

    send_update(&mut sender, "example.com", json!("abc")).await;

    let error = next_named(&mut sender, "configError").await;
    assert!(error["data"]["message"].as_str().unwrap().contains("abc"));
    assert_eq!(*monitor.engine.target(), target_for(backend));

    // The observer only ever sees periodic stats.
    let quiet = async {
        loop {
            let event = next_event(&mut observer).await;
            assert_eq!(event["event"], "stats", "unexpected {event}");
        }
    };
    let _ = tokio::time::timeout(Duration::from_millis(500), quiet).await;

    monitor.shutdown.trigger();
}

#[tokio::test]
async fn test_malformed_command_gets_config_error() {
    let backend = start_mock_backend(MockResponse::ok("")).await;
    let monitor = start_monitor(target_for(backend)).await;
    let mut socket = connect(&monitor.dashboard_ws()).await;
    next_named(&mut socket, "configUpdated").await;

    socket
        .send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();

    let error = next_named(&mut socket, "configError").await;
    assert!(error["data"]["message"].is_string());

    monitor.shutdown.trigger();
}

#[tokio::test]
async fn test_proxied_request_is_streamed() {
    let backend = start_mock_backend(MockResponse::ok("").with_status(201)).await;
    let monitor = start_monitor(target_for(backend)).await;
    let mut socket = connect(&monitor.dashboard_ws()).await;
    next_named(&mut socket, "configUpdated").await;

    http_client()
        .post(monitor.proxy_url("/items"))
        .body("<item/>")
        .send()
        .await
        .unwrap();

    let event = next_named(&mut socket, "request").await;
    let data = &event["data"];
    assert_eq!(data["method"], "POST");
    assert_eq!(data["path"], "/items");
    assert_eq!(data["payloadType"], "xml");
    assert_eq!(data["statusCode"], 201);
    assert_eq!(data["responseMessage"], "Created successfully");
    assert!(data["responseTimeMs"].is_u64());

    monitor.shutdown.trigger();
}

#[tokio::test]
async fn test_periodic_stats_reflect_traffic() {
    let backend = start_mock_backend(MockResponse::ok("{}")).await;
    let monitor = start_monitor(target_for(backend)).await;
    let mut socket = connect(&monitor.dashboard_ws()).await;
    next_named(&mut socket, "configUpdated").await;

    http_client()
        .post(monitor.proxy_url("/a"))
        .body("[1,2]")
        .send()
        .await
        .unwrap();

    let mut seen = None;
    for _ in 0..10 {
        let stats = next_named(&mut socket, "stats").await;
        if stats["data"]["totalRequests"] == 1 {
            seen = Some(stats);
            break;
        }
    }
    let stats = seen.expect("no stats snapshot counted the request");
    assert_eq!(stats["data"]["jsonRequests"], 1);
    assert_eq!(stats["data"]["endpoints"]["recent"][0]["path"], "/a");
    assert_eq!(stats["data"]["methodCounts"]["POST"], 1);

    monitor.shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_closes_dashboard_sockets() {
    let backend = start_mock_backend(MockResponse::ok("")).await;
    let monitor = start_monitor(target_for(backend)).await;
    let mut socket = connect(&monitor.dashboard_ws()).await;
    next_named(&mut socket, "configUpdated").await;

    monitor.shutdown.trigger();

    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "socket stayed open after shutdown");
}
