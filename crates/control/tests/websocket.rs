use std::time::Duration;

use control::{send_message, spawn, ControlConfig, ControlError, ControlHandle};
use futures_util::SinkExt;
use params::BlendStrength;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

fn loopback() -> ControlConfig {
    ControlConfig {
        host: "127.0.0.1".into(),
        port: 0,
    }
}

fn start(store: &BlendStrength) -> (ControlHandle, String) {
    let handle = spawn(&loopback(), store.clone()).expect("control server starts");
    let url = format!("ws://{}", handle.local_addr());
    (handle, url)
}

async fn wait_for(store: &BlendStrength, expected: f32) -> bool {
    for _ in 0..300 {
        if store.get() == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn applies_blend_strength_messages() {
    let store = BlendStrength::new(2.0);
    let (handle, url) = start(&store);

    send_message(&url, "change_blend_strength:3.5")
        .await
        .expect("send succeeds");
    assert!(wait_for(&store, 3.5).await, "value was {}", store.get());

    handle.stop().expect("stop");
}

#[tokio::test]
async fn malformed_messages_do_not_end_the_connection() {
    let store = BlendStrength::new(2.0);
    let (handle, url) = start(&store);

    let (mut socket, _) = connect_async(url.as_str()).await.expect("connect");
    for message in [
        "change_blend_strength:abc",
        "not a command",
        "change_blend_strength:1:2",
        "unknown_command:7",
    ] {
        socket
            .send(Message::Text(message.to_string()))
            .await
            .expect("send");
    }
    socket
        .send(Message::Binary(vec![1, 2, 3]))
        .await
        .expect("send binary");
    socket
        .send(Message::Text("change_blend_strength:4.25".into()))
        .await
        .expect("send valid");

    assert!(wait_for(&store, 4.25).await, "value was {}", store.get());
    socket.close(None).await.ok();
    handle.stop().expect("stop");
}

#[tokio::test]
async fn broken_connection_does_not_affect_others() {
    let store = BlendStrength::new(2.0);
    let (handle, url) = start(&store);

    // Not a websocket handshake at all; the server drops this connection.
    let mut raw = TcpStream::connect(handle.local_addr()).await.expect("raw connect");
    raw.write_all(b"garbage\r\n\r\n").await.expect("write garbage");
    drop(raw);

    send_message(&url, "change_blend_strength:0.5")
        .await
        .expect("send succeeds");
    assert!(wait_for(&store, 0.5).await, "value was {}", store.get());

    handle.stop().expect("stop");
}

#[tokio::test]
async fn rapid_updates_keep_the_last_value() {
    let store = BlendStrength::new(2.0);
    let (handle, url) = start(&store);

    let (mut socket, _) = connect_async(url.as_str()).await.expect("connect");
    for step in 1..=200 {
        socket
            .send(Message::Text(format!("change_blend_strength:{step}")))
            .await
            .expect("send");
    }

    assert!(wait_for(&store, 200.0).await, "value was {}", store.get());
    socket.close(None).await.ok();
    handle.stop().expect("stop");
}

#[tokio::test]
async fn stop_closes_the_listener() {
    let store = BlendStrength::default();
    let (handle, _url) = start(&store);
    let addr = handle.local_addr();

    handle.stop().expect("stop");
    assert!(TcpStream::connect(addr).await.is_err());
}

#[test]
fn bind_failure_is_reported() {
    let store = BlendStrength::default();
    let (first, _url) = start(&store);
    let taken = ControlConfig {
        host: "127.0.0.1".into(),
        port: first.local_addr().port(),
    };

    let err = match spawn(&taken, store.clone()) {
        Ok(_) => panic!("second bind on the same port should fail"),
        Err(err) => err,
    };
    assert!(matches!(err, ControlError::Bind { .. }), "got {err:?}");

    first.stop().expect("stop");
}

#[test]
fn handle_reports_configured_host_in_url() {
    let store = BlendStrength::default();
    let handle = spawn(&loopback(), store).expect("start");
    let port = handle.local_addr().port();
    assert_eq!(handle.url(), format!("ws://127.0.0.1:{port}"));
    handle.stop().expect("stop");
}
