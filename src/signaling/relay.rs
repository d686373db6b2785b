//! Publish/subscribe relay server
//!
//! Each WebSocket connection may subscribe to any number of topics with a
//! `_subscribe` control envelope. Every other envelope is forwarded verbatim
//! to the other subscribers of its topic. The relay never interprets the
//! `message` payload.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::tungstenite::Message;

use super::{Envelope, SUBSCRIBE_TOPIC};

type ConnId = u64;
type Topics = Arc<RwLock<FxHashMap<String, FxHashMap<ConnId, mpsc::Sender<String>>>>>;

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address to listen on
    pub bind_addr: String,
    /// Per-connection outbound queue length
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9090".to_string(),
            channel_capacity: 256,
        }
    }
}

/// Bound relay server
pub struct RelayServer {
    listener: TcpListener,
    config: RelayConfig,
    topics: Topics,
    next_conn: Arc<AtomicU64>,
}

impl RelayServer {
    /// Bind the listener.
    ///
    /// # Errors
    /// Returns an I/O error if the address cannot be bound.
    pub async fn bind(config: RelayConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        Ok(Self {
            listener,
            config,
            topics: Arc::new(RwLock::new(FxHashMap::default())),
            next_conn: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    ///
    /// # Errors
    /// Returns an I/O error if the socket has no local address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            log::info!("Relay listening on ws://{addr}");
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let conn_id = self.next_conn.fetch_add(1, Ordering::Relaxed);
                    let topics = self.topics.clone();
                    let capacity = self.config.channel_capacity;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, conn_id, topics, capacity).await
                        {
                            log::warn!("Relay connection {addr} ended with error: {e}");
                        }
                    });
                }
                Err(e) => log::error!("Relay accept error: {e}"),
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    conn_id: ConnId,
    topics: Topics,
    capacity: usize,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_writer, mut ws_reader) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));

    log::debug!("Relay connection {conn_id} opened");

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_writer.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut reply_id: u64 = 0;
    while let Some(msg) = ws_reader.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let envelope = match Envelope::decode(text.as_str()) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("Relay dropping malformed envelope from {conn_id}: {e}");
                continue;
            }
        };

        if envelope.topic == SUBSCRIBE_TOPIC {
            topics
                .write()
                .await
                .entry(envelope.message.clone())
                .or_default()
                .insert(conn_id, tx.clone());
            log::debug!("Connection {conn_id} subscribed to {}", envelope.message);

            let reply = Envelope::system(format!("subscribed:{}", envelope.message), reply_id);
            reply_id += 1;
            if let Ok(reply) = reply.encode() {
                let _ = tx.send(reply).await;
            }
            continue;
        }

        forward(&topics, conn_id, &envelope.topic, text.as_str()).await;
    }

    remove_connection(&topics, conn_id).await;
    drop(tx);
    let _ = writer.await;
    log::debug!("Relay connection {conn_id} closed");
    Ok(())
}

/// Send `text` to every subscriber of `topic` except the sender
async fn forward(topics: &Topics, sender: ConnId, topic: &str, text: &str) {
    let targets: Vec<mpsc::Sender<String>> = topics
        .read()
        .await
        .get(topic)
        .map(|subs| {
            subs.iter()
                .filter(|(id, _)| **id != sender)
                .map(|(_, tx)| tx.clone())
                .collect()
        })
        .unwrap_or_default();

    for tx in targets {
        let _ = tx.send(text.to_string()).await;
    }
}

async fn remove_connection(topics: &Topics, conn_id: ConnId) {
    let mut topics = topics.write().await;
    topics.retain(|_, subs| {
        subs.remove(&conn_id);
        !subs.is_empty()
    });
}
