use crate::error::ClientError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Command names consumed on the daemon's request/response surface.
pub mod command {
    pub const GET_PROFILES: &str = "get_profiles";
    pub const PATCH_PROFILES: &str = "patch_profiles";
    pub const IMPORT_PROFILE: &str = "import_profile";
    pub const DELETE_PROFILE: &str = "delete_profile";
    pub const UPDATE_PROFILE: &str = "update_profile";
    pub const ENHANCE_PROFILES: &str = "enhance_profiles";
    pub const GET_RUNTIME_LOGS: &str = "get_runtime_logs";
    pub const CLOSE_ALL_CONNECTIONS: &str = "close_all_connections";
}

/// Event names consumed on the daemon's push surface.
pub mod event {
    pub const CONFIG_REFRESHED: &str = "config_refreshed";
    pub const SETTINGS_CHANGED: &str = "settings_changed";
    pub const NOTICE: &str = "notice";
}

#[derive(Clone, Debug, PartialEq)]
pub struct BackendEvent {
    pub name: String,
    pub payload: JsonValue,
}

/// Receiving side of an event subscription. Dropping it is the unsubscribe.
pub struct EventSubscription {
    receiver: broadcast::Receiver<BackendEvent>,
    filter: Option<String>,
}

impl EventSubscription {
    pub fn new(receiver: broadcast::Receiver<BackendEvent>) -> Self {
        Self { receiver, filter: None }
    }

    /// Subscription that only yields events with the given name; transports
    /// that push every event on one channel use this to fan out.
    pub fn filtered(receiver: broadcast::Receiver<BackendEvent>, name: impl Into<String>) -> Self {
        Self { receiver, filter: Some(name.into()) }
    }

    /// Next matching event, or `None` once the sending side is gone.
    pub async fn next(&mut self) -> Option<BackendEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => match &self.filter {
                    Some(name) if *name != event.name => continue,
                    _ => return Some(event),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("[events] subscription lagged, dropped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The two capabilities the coordination core needs from a daemon transport:
/// invoke a named command and subscribe to a named event stream. Everything
/// else (socket, framing, auth) is the transport's business.
pub trait Bridge: Send + Sync + 'static {
    fn invoke(
        &self,
        command: &str,
        args: JsonValue,
    ) -> impl Future<Output = Result<JsonValue, ClientError>> + Send;

    fn subscribe(
        &self,
        event: &str,
    ) -> impl Future<Output = Result<EventSubscription, ClientError>> + Send;
}

impl<B: Bridge> Bridge for Arc<B> {
    fn invoke(
        &self,
        command: &str,
        args: JsonValue,
    ) -> impl Future<Output = Result<JsonValue, ClientError>> + Send {
        self.as_ref().invoke(command, args)
    }

    fn subscribe(
        &self,
        event: &str,
    ) -> impl Future<Output = Result<EventSubscription, ClientError>> + Send {
        self.as_ref().subscribe(event)
    }
}

pub(crate) async fn invoke_typed<B: Bridge, T: DeserializeOwned>(
    bridge: &B,
    command: &str,
    args: JsonValue,
) -> Result<T, ClientError> {
    let value = bridge.invoke(command, args).await?;
    serde_json::from_value(value)
        .map_err(|err| ClientError::Parse(format!("decoding {command} reply: {err}")))
}

pub(crate) fn encode_args<T: Serialize>(command: &str, args: &T) -> Result<JsonValue, ClientError> {
    serde_json::to_value(args)
        .map_err(|err| ClientError::Parse(format!("encoding {command} args: {err}")))
}
