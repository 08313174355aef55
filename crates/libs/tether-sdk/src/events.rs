use crate::bridge::{event, BackendEvent, Bridge};
use crate::error::ClientError;
use crate::notice::{classify, NoticeSink};
use crate::store::ProfileStore;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// State changes forwarded to the embedding shell instead of being handled
/// inside the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    SettingsChanged,
}

#[derive(Debug, Deserialize)]
struct NoticePayload {
    status: String,
    #[serde(default)]
    message: String,
}

/// Subscribes to the daemon's push surface and routes each event: refreshed
/// configuration refetches the profile mirror, settings changes are forwarded
/// as a [`Signal`], and notice payloads go through the status table. The task
/// ends once the transport stops delivering events.
pub async fn spawn_router<B: Bridge>(
    bridge: Arc<B>,
    store: Arc<ProfileStore<B>>,
    notices: NoticeSink,
    signals: broadcast::Sender<Signal>,
) -> Result<JoinHandle<()>, ClientError> {
    let mut refreshed = bridge.subscribe(event::CONFIG_REFRESHED).await?;
    let mut settings = bridge.subscribe(event::SETTINGS_CHANGED).await?;
    let mut pushed_notices = bridge.subscribe(event::NOTICE).await?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                incoming = refreshed.next() => match incoming {
                    Some(_) => {
                        if let Err(err) = store.refresh_profiles().await {
                            log::warn!("[events] profile refresh failed: {err}");
                        }
                    }
                    None => break,
                },
                incoming = settings.next() => match incoming {
                    Some(_) => {
                        let _ = signals.send(Signal::SettingsChanged);
                    }
                    None => break,
                },
                incoming = pushed_notices.next() => match incoming {
                    Some(BackendEvent { payload, .. }) => {
                        match serde_json::from_value::<NoticePayload>(payload) {
                            Ok(notice) => {
                                if let Some(notice) = classify(&notice.status, &notice.message) {
                                    notices.publish(notice);
                                }
                            }
                            Err(err) => log::debug!("[events] malformed notice payload: {err}"),
                        }
                    }
                    None => break,
                },
            }
        }
    }))
}
