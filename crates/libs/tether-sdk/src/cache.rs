use crate::error::ClientError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;

/// Data-layer retry policy: every mirror fetch gets this many retries with a
/// fixed pause between attempts. Mutating commands are never retried.
pub const FETCH_RETRIES: usize = 3;
pub const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Single-value cache keyed by the command that fills it. Concurrent readers
/// of an empty cell share one fetch; the lock is held across the fetch so a
/// second reader waits and then observes the cached value.
pub struct CacheCell<T> {
    key: &'static str,
    slot: Mutex<Option<T>>,
}

impl<T: Clone> CacheCell<T> {
    pub fn new(key: &'static str) -> Self {
        Self { key, slot: Mutex::new(None) }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<T, ClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }
        let value = with_retries(self.key, fetch).await?;
        *slot = Some(value.clone());
        Ok(value)
    }

    /// Drops the cached value then fetches a fresh one.
    pub async fn refresh<F, Fut>(&self, fetch: F) -> Result<T, ClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut slot = self.slot.lock().await;
        *slot = None;
        let value = with_retries(self.key, fetch).await?;
        *slot = Some(value.clone());
        Ok(value)
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    pub async fn peek(&self) -> Option<T> {
        self.slot.lock().await.clone()
    }
}

pub(crate) async fn with_retries<T, F, Fut>(key: &str, fetch: F) -> Result<T, ClientError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0;
    loop {
        match fetch().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < FETCH_RETRIES => {
                attempt += 1;
                log::warn!("[cache] {key} fetch failed (attempt {attempt}): {err}");
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            Err(err) => return Err(err),
        }
    }
}
