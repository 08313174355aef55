use crate::bridge::Bridge;
use crate::flight::FlightCache;
use crate::gate::ActionGate;
use crate::notice::NoticeSink;
use crate::store::ProfileStore;
use crate::throttle::Throttle;
use crate::types::ProfileKind;
use std::sync::Arc;
use std::time::Duration;

/// Trailing-edge window for the coalesced profile refresh that follows each
/// successful per-entry update.
pub const REFRESH_WINDOW: Duration = Duration::from_millis(2000);

const ACTION_UPDATE_ALL: &str = "update_all";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Uids selected for this batch, in display order.
    pub attempted: Vec<String>,
    /// Entries whose refresh failed, with the failure message.
    pub failed: Vec<(String, String)>,
}

/// Refreshes every remote profile concurrently while the flight cache keeps
/// overlapping invocations from touching the same entry twice.
pub struct BulkUpdater<B: Bridge> {
    store: Arc<ProfileStore<B>>,
    flights: FlightCache,
    gate: ActionGate,
    notices: NoticeSink,
    refresh: Throttle,
}

impl<B: Bridge> BulkUpdater<B> {
    pub fn new(
        store: Arc<ProfileStore<B>>,
        flights: FlightCache,
        gate: ActionGate,
        notices: NoticeSink,
    ) -> Self {
        let refresh_store = Arc::clone(&store);
        let refresh = Throttle::new(REFRESH_WINDOW, move || {
            let store = Arc::clone(&refresh_store);
            async move {
                if let Err(err) = store.refresh_profiles().await {
                    log::warn!("[update] coalesced profile refresh failed: {err}");
                }
            }
        });
        Self { store, flights, gate, notices, refresh }
    }

    pub fn flights(&self) -> &FlightCache {
        &self.flights
    }

    /// Updates every remote entry that is not already in flight. The whole
    /// batch is flagged in flight in one atomic map replacement before the
    /// first network call, so a second invocation cannot reselect entries
    /// this one is still refreshing. Returns `None` when an update-all is
    /// already pending; otherwise resolves once every selected entry has
    /// settled, failures included.
    pub async fn update_all(&self) -> Option<UpdateReport> {
        let Some(_guard) = self.gate.try_acquire(ACTION_UPDATE_ALL) else {
            return None;
        };

        let view = match self.store.view().await {
            Ok(view) => view,
            Err(err) => {
                self.notices.error(err.to_string());
                return Some(UpdateReport::default());
            }
        };

        let mut pending: Vec<String> = Vec::new();
        self.flights.replace(|old| {
            pending = view
                .regular
                .iter()
                .filter(|entry| {
                    entry.kind == ProfileKind::Remote
                        && !old.get(entry.uid.as_str()).copied().unwrap_or(false)
                })
                .map(|entry| entry.uid.clone())
                .collect();
            let mut next = old.clone();
            for uid in &pending {
                next.insert(uid.clone(), true);
            }
            next
        });

        let mut workers = Vec::with_capacity(pending.len());
        for uid in &pending {
            let store = Arc::clone(&self.store);
            let flights = self.flights.clone();
            let refresh = self.refresh.clone();
            let notices = self.notices.clone();
            let uid = uid.clone();
            workers.push(tokio::spawn(async move {
                let result = store.update_profile(&uid).await;
                // The flag clears however the update settled.
                flights.clear(&uid);
                match result {
                    Ok(()) => {
                        refresh.tap();
                        None
                    }
                    Err(err) => {
                        notices.error(format!("update of {uid} failed: {err}"));
                        Some((uid, err.to_string()))
                    }
                }
            }));
        }

        let mut report = UpdateReport { attempted: pending, failed: Vec::new() };
        for worker in workers {
            match worker.await {
                Ok(Some(failure)) => report.failed.push(failure),
                Ok(None) => {}
                Err(err) => log::warn!("[update] worker task failed: {err}"),
            }
        }
        Some(report)
    }
}
