use crate::bridge::{command, Bridge};
use crate::error::ClientError;
use crate::gate::ActionGate;
use crate::notice::NoticeSink;
use crate::store::ProfileStore;
use crate::types::{ProfileKind, ProfilesPatch};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Grace period the daemon gets to finish applying a new selection before
/// the deferred re-composition request is sent. Fixed delay, no retry and no
/// confirmation.
pub const RECONCILE_DELAY: Duration = Duration::from_millis(2000);

/// How a user-initiated operation settled. `Dropped` means an identical
/// action was still pending and this call was discarded, not queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Noop,
    Dropped,
    Failed,
}

mod action {
    pub const SELECT: &str = "select";
    pub const ENABLE: &str = "enable";
    pub const DISABLE: &str = "disable";
    pub const DELETE: &str = "delete";
    pub const MOVE_FRONT: &str = "move_front";
    pub const MOVE_END: &str = "move_end";
    pub const ENHANCE: &str = "enhance";
    pub const IMPORT: &str = "import";
}

/// Sequences selection and chain mutations against the daemon. Each chain
/// mutation is a read-modify-write of the cached chain snapshot followed by
/// one patch call; within this process the per-action gate is the only thing
/// preventing two mutations from interleaving. Another client session
/// racing us is not guarded against.
pub struct Coordinator<B: Bridge> {
    bridge: Arc<B>,
    store: Arc<ProfileStore<B>>,
    gate: ActionGate,
    notices: NoticeSink,
}

impl<B: Bridge> Coordinator<B> {
    pub fn new(
        bridge: Arc<B>,
        store: Arc<ProfileStore<B>>,
        gate: ActionGate,
        notices: NoticeSink,
    ) -> Self {
        Self { bridge, store, gate, notices }
    }

    /// Makes `uid` the current base profile. Selecting the profile that is
    /// already current is a no-op unless `force` is set. The daemon gets a
    /// deferred re-composition request [`RECONCILE_DELAY`] after the patch
    /// lands.
    pub async fn select_current(&self, uid: &str, force: bool) -> Outcome {
        let Some(_guard) = self.gate.try_acquire(action::SELECT) else {
            return Outcome::Dropped;
        };

        let set = match self.store.profiles().await {
            Ok(set) => set,
            Err(err) => return self.fail(err),
        };
        if !force && set.current.as_deref() == Some(uid) {
            return Outcome::Noop;
        }
        match set.entry(uid) {
            Some(entry) if entry.kind.is_regular() => {}
            Some(entry) => {
                return self.fail(ClientError::Backend(format!(
                    "profile {uid} is a {} profile and cannot be selected",
                    entry.kind.as_str()
                )))
            }
            None => return self.fail(ClientError::NotFound(format!("profile {uid} does not exist"))),
        }

        if let Err(err) = self.apply_current(uid).await {
            return self.fail(err);
        }
        if let Err(err) = self.bridge.invoke(command::CLOSE_ALL_CONNECTIONS, JsonValue::Null).await {
            log::warn!("[activate] failed to drop stale connections: {err}");
        }
        self.notices.success("Refreshed proxy configuration");
        Outcome::Applied
    }

    /// Appends `uid` to the end of the chain; already-enabled entries are
    /// left where they are.
    pub async fn enable_chain(&self, uid: &str) -> Outcome {
        self.patch_chain(action::ENABLE, |chain| {
            if chain.iter().any(|id| id == uid) {
                return None;
            }
            let mut next = chain.to_vec();
            next.push(uid.to_string());
            Some(next)
        })
        .await
    }

    pub async fn disable_chain(&self, uid: &str) -> Outcome {
        self.patch_chain(action::DISABLE, |chain| remove_from_chain(chain, uid)).await
    }

    /// Disables the entry if needed, then deletes it. A delete failure after
    /// a successful disable leaves the entry disabled-but-present; that
    /// partial state is reported, not rolled back.
    pub async fn delete_entry(&self, uid: &str) -> Outcome {
        let Some(_guard) = self.gate.try_acquire(action::DELETE) else {
            return Outcome::Dropped;
        };

        if self.patch_chain_inner(|chain| remove_from_chain(chain, uid)).await == Outcome::Failed {
            return Outcome::Failed;
        }
        if let Err(err) = self.store.delete_profile(uid).await {
            return self.fail(err);
        }
        self.refresh_after_mutation().await;
        Outcome::Applied
    }

    pub async fn move_to_front(&self, uid: &str) -> Outcome {
        self.patch_chain(action::MOVE_FRONT, |chain| {
            if !chain.iter().any(|id| id == uid) {
                return None;
            }
            let mut next: Vec<String> =
                chain.iter().filter(|id| id.as_str() != uid).cloned().collect();
            next.insert(0, uid.to_string());
            Some(next)
        })
        .await
    }

    pub async fn move_to_end(&self, uid: &str) -> Outcome {
        self.patch_chain(action::MOVE_END, |chain| {
            if !chain.iter().any(|id| id == uid) {
                return None;
            }
            let mut next: Vec<String> =
                chain.iter().filter(|id| id.as_str() != uid).cloned().collect();
            next.push(uid.to_string());
            Some(next)
        })
        .await
    }

    /// Asks the daemon to re-compose the chain over the current selection.
    pub async fn enhance(&self) -> Outcome {
        let Some(_guard) = self.gate.try_acquire(action::ENHANCE) else {
            return Outcome::Dropped;
        };

        if let Err(err) = self.bridge.invoke(command::ENHANCE_PROFILES, JsonValue::Null).await {
            return self.fail(err);
        }
        if let Err(err) = self.store.refresh_logs().await {
            log::warn!("[activate] log refresh after enhance failed: {err}");
        }
        self.notices.success("Refreshed proxy configuration");
        Outcome::Applied
    }

    /// Imports a new profile. When nothing is selected yet and the import
    /// leaves a remote entry in the set, the first remote entry is adopted
    /// as current.
    pub async fn import(&self, locator: &str) -> Outcome {
        let Some(_guard) = self.gate.try_acquire(action::IMPORT) else {
            return Outcome::Dropped;
        };

        if let Err(err) = self.store.import_profile(locator).await {
            return self.fail(err);
        }
        self.notices.success("Imported profile");

        let set = match self.store.refresh_profiles().await {
            Ok(set) => set,
            Err(err) => {
                log::warn!("[import] refresh after import failed: {err}");
                return Outcome::Applied;
            }
        };
        if set.current.is_none() {
            if let Some(remote) = set.items.iter().find(|entry| entry.kind == ProfileKind::Remote) {
                let uid = remote.uid.clone();
                if let Err(err) = self.apply_current(&uid).await {
                    log::warn!("[import] failed to adopt {uid} as current: {err}");
                }
            }
        }
        Outcome::Applied
    }

    async fn patch_chain<F>(&self, key: &'static str, mutate: F) -> Outcome
    where
        F: FnOnce(&[String]) -> Option<Vec<String>>,
    {
        let Some(_guard) = self.gate.try_acquire(key) else {
            return Outcome::Dropped;
        };
        self.patch_chain_inner(mutate).await
    }

    async fn patch_chain_inner<F>(&self, mutate: F) -> Outcome
    where
        F: FnOnce(&[String]) -> Option<Vec<String>>,
    {
        let set = match self.store.profiles().await {
            Ok(set) => set,
            Err(err) => return self.fail(err),
        };
        let Some(next) = mutate(&set.chain) else {
            return Outcome::Noop;
        };
        if let Err(err) = self.store.patch_profiles(&ProfilesPatch::with_chain(next)).await {
            return self.fail(err);
        }
        self.refresh_after_mutation().await;
        Outcome::Applied
    }

    /// Patch the current selection and schedule the deferred reconciliation.
    async fn apply_current(&self, uid: &str) -> Result<(), ClientError> {
        self.store.patch_profiles(&ProfilesPatch::with_current(uid)).await?;
        self.refresh_after_mutation().await;
        self.schedule_reconcile();
        Ok(())
    }

    /// The daemon owns persistence; after any accepted mutation the mirrors
    /// are refetched rather than patched optimistically.
    async fn refresh_after_mutation(&self) {
        if let Err(err) = self.store.refresh_profiles().await {
            log::warn!("[activate] profile refresh failed: {err}");
        }
        if let Err(err) = self.store.refresh_logs().await {
            log::warn!("[activate] log refresh failed: {err}");
        }
    }

    fn schedule_reconcile(&self) {
        let bridge = Arc::clone(&self.bridge);
        tokio::spawn(async move {
            tokio::time::sleep(RECONCILE_DELAY).await;
            if let Err(err) = bridge.invoke(command::ENHANCE_PROFILES, JsonValue::Null).await {
                log::warn!("[activate] deferred reconciliation failed: {err}");
            }
        });
    }

    fn fail(&self, err: ClientError) -> Outcome {
        self.notices.error(err.to_string());
        Outcome::Failed
    }
}

fn remove_from_chain(chain: &[String], uid: &str) -> Option<Vec<String>> {
    if !chain.iter().any(|id| id == uid) {
        return None;
    }
    Some(chain.iter().filter(|id| id.as_str() != uid).cloned().collect())
}
