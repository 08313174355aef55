#![allow(dead_code)]

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tether_sdk::{
    command, BackendEvent, Bridge, ClientError, EventSubscription, ProfileEntry, ProfileKind,
    ProfileSet, ProfileUsage, ProfilesPatch,
};
use tokio::sync::{broadcast, Semaphore};

/// In-memory daemon double: serves a mutable `ProfileSet`, records every
/// command, and can hold or fail individual commands so tests can steer
/// interleavings.
pub struct MockBridge {
    profiles: Mutex<ProfileSet>,
    calls: Mutex<Vec<(String, JsonValue)>>,
    /// Keyed by command name, or `command:uid` to fail one entry only.
    failures: Mutex<HashMap<String, (String, String)>>,
    holds: Mutex<HashMap<String, Arc<Semaphore>>>,
    events: broadcast::Sender<BackendEvent>,
}

impl MockBridge {
    pub fn new(profiles: ProfileSet) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            profiles: Mutex::new(profiles),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            holds: Mutex::new(HashMap::new()),
            events,
        })
    }

    pub fn entry(uid: &str, kind: ProfileKind) -> ProfileEntry {
        ProfileEntry {
            uid: uid.to_string(),
            kind,
            name: uid.to_string(),
            locator: String::new(),
            usage: ProfileUsage::default(),
            updated: 0,
        }
    }

    pub fn profiles(&self) -> ProfileSet {
        self.profiles.lock().unwrap().clone()
    }

    pub fn set_profiles(&self, profiles: ProfileSet) {
        *self.profiles.lock().unwrap() = profiles;
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(command, _)| command == name).count()
    }

    pub fn recorded(&self) -> Vec<(String, JsonValue)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_args(&self, name: &str) -> Option<JsonValue> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(command, _)| command == name)
            .map(|(_, args)| args.clone())
    }

    /// Fails `key` (a command name, or `command:uid`) with a wire error.
    pub fn fail(&self, key: &str, code: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(key.to_string(), (code.to_string(), message.to_string()));
    }

    /// Holds every invocation of `name` until the returned semaphore gets a
    /// permit per held call.
    pub fn hold(&self, name: &str) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        self.holds.lock().unwrap().insert(name.to_string(), Arc::clone(&semaphore));
        semaphore
    }

    pub fn push_event(&self, name: &str, payload: JsonValue) {
        let _ = self.events.send(BackendEvent { name: name.to_string(), payload });
    }
}

impl Bridge for MockBridge {
    async fn invoke(&self, name: &str, args: JsonValue) -> Result<JsonValue, ClientError> {
        self.calls.lock().unwrap().push((name.to_string(), args.clone()));

        let hold = self.holds.lock().unwrap().get(name).cloned();
        if let Some(hold) = hold {
            hold.acquire().await.expect("hold semaphore closed").forget();
        }

        let failure = {
            let failures = self.failures.lock().unwrap();
            failures.get(name).cloned().or_else(|| {
                args.get("uid")
                    .and_then(JsonValue::as_str)
                    .and_then(|uid| failures.get(&format!("{name}:{uid}")).cloned())
            })
        };
        if let Some((code, message)) = failure {
            return Err(ClientError::from_wire(&code, message));
        }

        match name {
            command::GET_PROFILES => {
                Ok(serde_json::to_value(self.profiles.lock().unwrap().clone())
                    .expect("profile set serializes"))
            }
            command::PATCH_PROFILES => {
                let patch: ProfilesPatch = serde_json::from_value(args)
                    .map_err(|err| ClientError::Parse(err.to_string()))?;
                let mut profiles = self.profiles.lock().unwrap();
                if let Some(current) = patch.current {
                    profiles.current = Some(current);
                }
                if let Some(chain) = patch.chain {
                    profiles.chain = chain;
                }
                Ok(JsonValue::Null)
            }
            command::DELETE_PROFILE => {
                let uid = args.get("uid").and_then(JsonValue::as_str).unwrap_or_default().to_string();
                let mut profiles = self.profiles.lock().unwrap();
                profiles.items.retain(|entry| entry.uid != uid);
                Ok(JsonValue::Null)
            }
            command::GET_RUNTIME_LOGS => Ok(serde_json::json!({})),
            _ => Ok(JsonValue::Null),
        }
    }

    async fn subscribe(&self, event: &str) -> Result<EventSubscription, ClientError> {
        Ok(EventSubscription::filtered(self.events.subscribe(), event))
    }
}

/// Lets queued tasks run without advancing the clock.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
