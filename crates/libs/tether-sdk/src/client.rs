use crate::bridge::{command, Bridge};
use crate::coordinator::Coordinator;
use crate::error::ClientError;
use crate::events::{spawn_router, Signal};
use crate::flight::FlightCache;
use crate::gate::ActionGate;
use crate::notice::{Notice, NoticeSink};
use crate::store::ProfileStore;
use crate::updater::BulkUpdater;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const SIGNAL_CHANNEL_CAPACITY: usize = 16;

/// Wires the store, coordinator and updater over one shared bridge, gate and
/// notice channel. Must be constructed inside a tokio runtime.
pub struct Client<B: Bridge> {
    bridge: Arc<B>,
    store: Arc<ProfileStore<B>>,
    coordinator: Coordinator<B>,
    updater: BulkUpdater<B>,
    notices: NoticeSink,
    signals: broadcast::Sender<Signal>,
}

impl<B: Bridge> Client<B> {
    pub fn new(bridge: B) -> Self {
        let bridge = Arc::new(bridge);
        let store = Arc::new(ProfileStore::new(Arc::clone(&bridge)));
        let notices = NoticeSink::new();
        let gate = ActionGate::new();
        let coordinator = Coordinator::new(
            Arc::clone(&bridge),
            Arc::clone(&store),
            gate.clone(),
            notices.clone(),
        );
        let updater =
            BulkUpdater::new(Arc::clone(&store), FlightCache::new(), gate, notices.clone());
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        Self { bridge, store, coordinator, updater, notices, signals }
    }

    pub fn store(&self) -> &ProfileStore<B> {
        &self.store
    }

    pub fn coordinator(&self) -> &Coordinator<B> {
        &self.coordinator
    }

    pub fn updater(&self) -> &BulkUpdater<B> {
        &self.updater
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn signals(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    /// Starts the event router over this client's bridge.
    pub async fn run_events(&self) -> Result<JoinHandle<()>, ClientError> {
        spawn_router(
            Arc::clone(&self.bridge),
            Arc::clone(&self.store),
            self.notices.clone(),
            self.signals.clone(),
        )
        .await
    }

    /// Tells the daemon to drop every live connection.
    pub async fn close_connections(&self) -> Result<(), ClientError> {
        self.bridge.invoke(command::CLOSE_ALL_CONNECTIONS, JsonValue::Null).await?;
        Ok(())
    }
}
