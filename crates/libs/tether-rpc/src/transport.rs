use crate::codec::{decode_payload, encode_frame, read_frame};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether_sdk::{BackendEvent, Bridge, ClientError, EventSubscription};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct RpcBridgeConfig {
    pub addr: String,
    pub connect_timeout: Duration,
}

impl Default for RpcBridgeConfig {
    fn default() -> Self {
        Self { addr: "127.0.0.1:4270".into(), connect_timeout: Duration::from_secs(3) }
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    id: u64,
    command: &'a str,
    args: &'a JsonValue,
}

/// Every server frame is either a command reply (`id` set) or a pushed
/// event (`event` set).
#[derive(Deserialize)]
struct WireFrame {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<JsonValue>,
    #[serde(default)]
    error: Option<WireError>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    payload: Option<JsonValue>,
}

#[derive(Deserialize)]
struct WireError {
    code: String,
    message: String,
}

type Waiters = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<JsonValue, ClientError>>>>>;

/// Bridge over one long-lived TCP connection to the daemon. A reader task
/// routes replies to their waiters and events to subscribers; once the
/// connection drops, every pending and future call fails with `Transport`.
pub struct RpcBridge {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    waiters: Waiters,
    events: broadcast::Sender<BackendEvent>,
    next_id: AtomicU64,
    closed: Arc<AtomicBool>,
}

impl RpcBridge {
    pub async fn connect(config: &RpcBridgeConfig) -> Result<Self, ClientError> {
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&config.addr))
            .await
            .map_err(|_| ClientError::Transport(format!("connect to {} timed out", config.addr)))?
            .map_err(|err| ClientError::Transport(format!("connect to {}: {err}", config.addr)))?;

        let (read_half, write_half) = stream.into_split();
        let waiters: Waiters = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));
        tokio::spawn(read_loop(
            read_half,
            Arc::clone(&waiters),
            events.clone(),
            Arc::clone(&closed),
        ));

        Ok(Self {
            writer: tokio::sync::Mutex::new(write_half),
            waiters,
            events,
            next_id: AtomicU64::new(1),
            closed,
        })
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    waiters: Waiters,
    events: broadcast::Sender<BackendEvent>,
    closed: Arc<AtomicBool>,
) {
    loop {
        let payload = match read_frame(&mut reader).await {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(err) => {
                log::warn!("[rpc] read failed: {err}");
                break;
            }
        };
        let frame: WireFrame = match decode_payload(&payload) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("[rpc] dropping undecodable frame: {err}");
                continue;
            }
        };

        if let Some(name) = frame.event {
            let _ = events.send(BackendEvent {
                name,
                payload: frame.payload.unwrap_or(JsonValue::Null),
            });
            continue;
        }

        let Some(id) = frame.id else {
            log::warn!("[rpc] reply frame without id");
            continue;
        };
        let waiter = waiters.lock().expect("rpc waiters mutex poisoned").remove(&id);
        let Some(waiter) = waiter else {
            continue;
        };
        let outcome = match frame.error {
            Some(error) => Err(ClientError::from_wire(&error.code, error.message)),
            None => Ok(frame.result.unwrap_or(JsonValue::Null)),
        };
        let _ = waiter.send(outcome);
    }

    // Connection is gone; fail anything still waiting for a reply. The flag
    // flips first so callers that register afterwards bail out themselves.
    closed.store(true, Ordering::SeqCst);
    let pending = std::mem::take(&mut *waiters.lock().expect("rpc waiters mutex poisoned"));
    for (_, waiter) in pending {
        let _ = waiter.send(Err(ClientError::Transport("connection closed".into())));
    }
}

impl Bridge for RpcBridge {
    async fn invoke(&self, command: &str, args: JsonValue) -> Result<JsonValue, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = encode_frame(&WireRequest { id, command, args: &args })?;

        let (tx, rx) = oneshot::channel();
        self.waiters.lock().expect("rpc waiters mutex poisoned").insert(id, tx);

        // If the reader already drained the waiter map, nobody will ever
        // answer this call; reclaim the slot instead of waiting forever.
        if self.closed.load(Ordering::SeqCst)
            && self.waiters.lock().expect("rpc waiters mutex poisoned").remove(&id).is_some()
        {
            return Err(ClientError::Transport("connection closed".into()));
        }

        {
            let mut writer = self.writer.lock().await;
            if let Err(err) = writer.write_all(&frame).await {
                self.waiters.lock().expect("rpc waiters mutex poisoned").remove(&id);
                return Err(ClientError::Transport(format!("write {command}: {err}")));
            }
        }

        rx.await.map_err(|_| ClientError::Transport("connection closed".into()))?
    }

    async fn subscribe(&self, event: &str) -> Result<EventSubscription, ClientError> {
        // The daemon pushes everything on this connection once interest is
        // registered; filtering down to one event name happens client-side.
        // The receiver must exist before the ack so nothing pushed right
        // after registration is lost.
        let receiver = self.events.subscribe();
        self.invoke("subscribe", serde_json::json!({ "event": event })).await?;
        Ok(EventSubscription::filtered(receiver, event))
    }
}
