use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;

/// Trailing-edge coalescer: any number of taps inside one window run the
/// action once, at the end of the window. The worker task exits when every
/// handle is dropped.
#[derive(Clone)]
pub struct Throttle {
    tx: mpsc::UnboundedSender<()>,
}

impl Throttle {
    /// Must be called from within a tokio runtime.
    pub fn new<F, Fut>(window: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(window).await;
                while rx.try_recv().is_ok() {}
                action().await;
            }
        });
        Self { tx }
    }

    pub fn tap(&self) {
        let _ = self.tx.send(());
    }
}
