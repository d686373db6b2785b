//! Signaling clients talking through a real relay on a loopback port

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use wordle_duet::signaling::{
    ChannelId, Envelope, RelayConfig, RelayServer, SYSTEM_TOPIC, SignalingClient,
};

const WAIT: Duration = Duration::from_secs(5);

async fn start_relay() -> String {
    let server = RelayServer::bind(RelayConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    format!("ws://{addr}")
}

fn listen(client: &SignalingClient) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.subscribe(move |text| {
        let _ = tx.send(text.to_string());
    });
    rx
}

/// Publish from `from` until `to` hears it. Readiness only means the socket
/// opened, so the receiver's subscription may not be registered yet.
async fn handshake(from: &SignalingClient, to: &mut mpsc::UnboundedReceiver<String>) {
    timeout(WAIT, async {
        loop {
            from.publish(&"ping").unwrap();
            sleep(Duration::from_millis(20)).await;
            if let Ok(text) = to.try_recv() {
                assert_eq!(text, "\"ping\"");
                break;
            }
        }
    })
    .await
    .unwrap();
}

/// Next payload that is not a leftover handshake ping
async fn recv(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(WAIT, async {
        loop {
            let text = rx.recv().await.unwrap();
            if text != "\"ping\"" {
                return text;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn payloads_reach_other_subscribers_of_the_channel_only() {
    let url = start_relay().await;
    let room = ChannelId::from("room");
    let a = SignalingClient::open(url.clone(), room.clone());
    let b = SignalingClient::open(url.clone(), room);
    let c = SignalingClient::open(url, ChannelId::from("elsewhere"));
    let mut a_rx = listen(&a);
    let mut b_rx = listen(&b);
    let mut c_rx = listen(&c);

    for client in [&a, &b, &c] {
        timeout(WAIT, client.ready()).await.unwrap().unwrap();
    }
    handshake(&a, &mut b_rx).await;

    a.publish(&serde_json::json!({"type": "init"})).unwrap();
    a.publish(&serde_json::json!({"type": "sdp"})).unwrap();

    let first = recv(&mut b_rx).await;
    let second = recv(&mut b_rx).await;
    assert_eq!(first, r#"{"type":"init"}"#);
    assert_eq!(second, r#"{"type":"sdp"}"#);

    sleep(Duration::from_millis(100)).await;
    assert!(a_rx.try_recv().is_err(), "sender must not hear itself");
    assert!(c_rx.try_recv().is_err(), "other channels must not hear it");
}

#[tokio::test]
async fn system_diagnostics_are_not_delivered_to_handlers() {
    let url = start_relay().await;

    // A raw socket sees the relay's subscription diagnostic on the wire
    let (mut raw, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let subscribe = Envelope::subscribe(&ChannelId::from("room"), 0);
    raw.send(Message::Text(subscribe.encode().unwrap().into()))
        .await
        .unwrap();
    let reply = timeout(WAIT, raw.next()).await.unwrap().unwrap().unwrap();
    let reply = Envelope::decode(reply.to_text().unwrap()).unwrap();
    assert_eq!(reply.topic, SYSTEM_TOPIC);
    assert_eq!(reply.message, "subscribed:room");

    // A client gets the same diagnostic but its handlers never see it
    let client = SignalingClient::open(url, ChannelId::from("room"));
    let mut rx = listen(&client);
    timeout(WAIT, client.ready()).await.unwrap().unwrap();

    let hello = Envelope {
        topic: "room".to_string(),
        message: "hello".to_string(),
        id: 1,
    };
    timeout(WAIT, async {
        loop {
            raw.send(Message::Text(hello.encode().unwrap().into()))
                .await
                .unwrap();
            sleep(Duration::from_millis(20)).await;
            if let Ok(text) = rx.try_recv() {
                assert_eq!(text, "hello");
                break;
            }
        }
    })
    .await
    .unwrap();

    while let Ok(text) = rx.try_recv() {
        assert_eq!(text, "hello");
    }
}

#[tokio::test]
async fn malformed_frames_do_not_break_the_relay() {
    let url = start_relay().await;
    let (mut raw, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    raw.send(Message::Text("not an envelope".into())).await.unwrap();

    let room = ChannelId::from("room");
    let a = SignalingClient::open(url.clone(), room.clone());
    let b = SignalingClient::open(url, room);
    let mut b_rx = listen(&b);
    timeout(WAIT, a.ready()).await.unwrap().unwrap();
    timeout(WAIT, b.ready()).await.unwrap().unwrap();

    handshake(&a, &mut b_rx).await;
}

#[tokio::test]
async fn ready_fails_without_a_relay() {
    let client = SignalingClient::open("ws://127.0.0.1:1", ChannelId::generate());
    let result = timeout(WAIT, client.ready()).await.unwrap();
    assert!(result.is_err());
    assert!(!client.is_open());
}

#[tokio::test]
async fn closed_client_stops_delivering() {
    let url = start_relay().await;
    let room = ChannelId::from("room");
    let a = SignalingClient::open(url.clone(), room.clone());
    let b = SignalingClient::open(url, room);
    let mut b_rx = listen(&b);
    timeout(WAIT, a.ready()).await.unwrap().unwrap();
    timeout(WAIT, b.ready()).await.unwrap().unwrap();
    handshake(&a, &mut b_rx).await;

    b.close();
    assert_eq!(b.handler_count(), 0);
    a.publish(&"late").unwrap();
    sleep(Duration::from_millis(100)).await;
    while let Ok(text) = b_rx.try_recv() {
        assert_eq!(text, "\"ping\"");
    }
}
