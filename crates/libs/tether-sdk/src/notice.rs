use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-visible notification. Operations publish these instead of letting
/// errors escape their boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Broadcast publisher for notices; subscribing while no operation runs
/// never misses anything because operations only publish while pending.
#[derive(Clone)]
pub struct NoticeSink {
    tx: broadcast::Sender<Notice>,
}

impl NoticeSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notice: Notice) {
        // Nobody listening is fine; notices are advisory.
        let _ = self.tx.send(notice);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(Notice::success(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(Notice::error(message));
    }
}

impl Default for NoticeSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed status table for daemon-pushed notices. Unrecognized statuses are
/// dropped on the floor.
pub fn classify(status: &str, message: &str) -> Option<Notice> {
    match status {
        "set_config::ok" => Some(Notice::success("Configuration refreshed")),
        "set_config::error" => Some(Notice::error(message)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_status_maps_to_a_success_notice() {
        let notice = classify("set_config::ok", "").unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, "Configuration refreshed");
    }

    #[test]
    fn error_status_carries_the_daemon_message() {
        let notice = classify("set_config::error", "invalid rule at line 3").unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "invalid rule at line 3");
    }

    #[test]
    fn unknown_statuses_are_ignored() {
        assert!(classify("restart::ok", "whatever").is_none());
    }

    #[tokio::test]
    async fn sink_delivers_to_subscribers() {
        let sink = NoticeSink::new();
        let mut rx = sink.subscribe();
        sink.success("done");
        assert_eq!(rx.recv().await.unwrap(), Notice::success("done"));
    }
}
