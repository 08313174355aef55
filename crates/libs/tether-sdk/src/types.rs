use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Local,
    Remote,
    Merge,
    Script,
}

impl ProfileKind {
    /// Regular profiles can be selected as the current base configuration.
    pub fn is_regular(self) -> bool {
        matches!(self, Self::Local | Self::Remote)
    }

    /// Enhancement profiles are layered on top of the current selection.
    pub fn is_enhance(self) -> bool {
        matches!(self, Self::Merge | Self::Script)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Merge => "merge",
            Self::Script => "script",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUsage {
    #[serde(default)]
    pub upload: u64,
    #[serde(default)]
    pub download: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub expire: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileEntry {
    pub uid: String,
    pub kind: ProfileKind,
    #[serde(default)]
    pub name: String,
    /// File path for local entries, subscription URL for remote ones.
    #[serde(default)]
    pub locator: String,
    #[serde(default)]
    pub usage: ProfileUsage,
    /// Unix seconds of the last successful content refresh.
    #[serde(default)]
    pub updated: u64,
}

/// Client-side mirror of the daemon's profile state. The daemon owns
/// persistence; this copy is kept consistent by re-fetching after each
/// mutation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileSet {
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub items: Vec<ProfileEntry>,
    /// Enhancement uids in application order, each at most once.
    #[serde(default)]
    pub chain: Vec<String>,
}

impl ProfileSet {
    pub fn entry(&self, uid: &str) -> Option<&ProfileEntry> {
        self.items.iter().find(|entry| entry.uid == uid)
    }

    pub fn chain_contains(&self, uid: &str) -> bool {
        self.chain.iter().any(|id| id == uid)
    }

    /// Splits the set into the two display lists. Regular entries keep their
    /// stored order. Enhancement entries come out in chain order first, then
    /// every enhancement not in the chain, stored order, appended at the end.
    /// Chain ids with no matching entry are skipped.
    pub fn view(&self) -> ProfileView {
        let regular = self
            .items
            .iter()
            .filter(|entry| entry.kind.is_regular())
            .cloned()
            .collect();

        let rest: Vec<&ProfileEntry> =
            self.items.iter().filter(|entry| entry.kind.is_enhance()).collect();

        let mut enhance = Vec::with_capacity(rest.len());
        for uid in &self.chain {
            match rest.iter().find(|entry| &entry.uid == uid) {
                Some(entry) => enhance.push((*entry).clone()),
                None => log::warn!("[profiles] chain references missing entry {uid}"),
            }
        }
        enhance.extend(
            rest.iter().filter(|entry| !self.chain_contains(&entry.uid)).map(|entry| (*entry).clone()),
        );

        ProfileView { regular, enhance }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileView {
    pub regular: Vec<ProfileEntry>,
    pub enhance: Vec<ProfileEntry>,
}

/// Partial update sent to the daemon; absent fields are left untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfilesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Vec<String>>,
}

impl ProfilesPatch {
    pub fn with_current(uid: impl Into<String>) -> Self {
        Self { current: Some(uid.into()), chain: None }
    }

    pub fn with_chain(chain: Vec<String>) -> Self {
        Self { current: None, chain: Some(chain) }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogLine {
    #[serde(default)]
    pub level: String,
    pub message: String,
}

/// Per-entry diagnostic output produced by the daemon while composing the
/// chain over the current selection.
pub type RuntimeLogs = BTreeMap<String, Vec<LogLine>>;
