use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Process-wide "update in flight" flags, one per profile uid. Every
/// mutation replaces the whole mapping in a single step (read the old map,
/// build the new one, install it), so overlapping writers never lose each
/// other's flags.
#[derive(Clone, Default)]
pub struct FlightCache {
    inner: Arc<Mutex<Arc<HashMap<String, bool>>>>,
}

impl FlightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<HashMap<String, bool>> {
        Arc::clone(&self.inner.lock().expect("flight cache mutex poisoned"))
    }

    pub fn is_in_flight(&self, uid: &str) -> bool {
        self.snapshot().get(uid).copied().unwrap_or(false)
    }

    /// Atomic whole-map replacement; returns the installed mapping.
    pub fn replace<F>(&self, produce: F) -> Arc<HashMap<String, bool>>
    where
        F: FnOnce(&HashMap<String, bool>) -> HashMap<String, bool>,
    {
        let mut guard = self.inner.lock().expect("flight cache mutex poisoned");
        let next = Arc::new(produce(&guard));
        *guard = Arc::clone(&next);
        next
    }

    pub fn clear(&self, uid: &str) {
        self.replace(|old| {
            let mut next = old.clone();
            next.insert(uid.to_string(), false);
            next
        });
    }
}
