//! Client-side coordination core for a local proxy daemon.
//!
//! The daemon owns the protocol engine, storage and scheduling; this crate
//! owns what a management shell needs on top of it: the profile mirror, the
//! selection/chain activation workflow and the bulk subscription updater,
//! all reached through an abstract [`Bridge`] (invoke a command, subscribe
//! to an event stream) so the transport stays swappable.

pub mod bridge;
pub mod cache;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod flight;
pub mod gate;
pub mod notice;
pub mod store;
pub mod throttle;
pub mod types;
pub mod updater;

mod client;

pub use bridge::{command, event, BackendEvent, Bridge, EventSubscription};
pub use client::Client;
pub use coordinator::{Coordinator, Outcome, RECONCILE_DELAY};
pub use error::ClientError;
pub use events::Signal;
pub use flight::FlightCache;
pub use gate::ActionGate;
pub use notice::{classify, Notice, NoticeLevel, NoticeSink};
pub use store::ProfileStore;
pub use throttle::Throttle;
pub use types::{
    LogLine, ProfileEntry, ProfileKind, ProfileSet, ProfileUsage, ProfileView, ProfilesPatch,
    RuntimeLogs,
};
pub use updater::{BulkUpdater, UpdateReport, REFRESH_WINDOW};
