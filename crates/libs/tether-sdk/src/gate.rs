use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Per-action reentrancy guard. While a key is held, further attempts to
/// acquire the same key fail; callers treat that as a silent no-op, never as
/// an error, and overlapping calls are dropped rather than queued.
#[derive(Clone, Default)]
pub struct ActionGate {
    held: Arc<Mutex<HashSet<&'static str>>>,
}

impl ActionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, key: &'static str) -> Option<GateGuard> {
        let mut held = self.held.lock().expect("action gate mutex poisoned");
        if !held.insert(key) {
            return None;
        }
        Some(GateGuard { key, held: Arc::clone(&self.held) })
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().expect("action gate mutex poisoned").contains(key)
    }
}

/// Releases the key when dropped, i.e. when the guarded operation settles.
pub struct GateGuard {
    key: &'static str,
    held: Arc<Mutex<HashSet<&'static str>>>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.held.lock().expect("action gate mutex poisoned").remove(self.key);
    }
}
