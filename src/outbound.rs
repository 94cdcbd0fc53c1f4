//! Outbound sender seam.
//!
//! Transmission, retry, and backoff belong to the host, not to reply
//! decision-making. [`RetryingSender`] wraps any sender with bounded
//! exponential backoff so the retry policy stays a decoration around the
//! collaborator rather than logic inside the engine.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::SendError;
use crate::types::ReplyRecord;

/// Delivers a decided reply to its channel (Hostaway, Slack, ...).
#[async_trait]
pub trait OutboundSender: Send + Sync {
    async fn send(&self, record: &ReplyRecord) -> Result<(), SendError>;
}

/// Retry decorator: up to `max_attempts` tries, doubling the delay after
/// each failure starting from `base_delay`.
pub struct RetryingSender<S> {
    inner: S,
    max_attempts: u32,
    base_delay: Duration,
}

impl<S: OutboundSender> RetryingSender<S> {
    pub fn new(inner: S, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }
}

#[async_trait]
impl<S: OutboundSender> OutboundSender for RetryingSender<S> {
    async fn send(&self, record: &ReplyRecord) -> Result<(), SendError> {
        let mut delay = self.base_delay;
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            match self.inner.send(record).await {
                Ok(()) => {
                    debug!(
                        conversation_id = %record.conversation_id,
                        attempt,
                        "Reply sent"
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        conversation_id = %record.conversation_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Send attempt failed"
                    );
                    last_err = Some(e);
                    if attempt < self.max_attempts {
                        sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| SendError("no attempts made".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::types::{Intent, ReplyDisposition};
    use chrono::Utc;
    use uuid::Uuid;

    /// Fails the first `fail_first` calls, then succeeds.
    struct FlakySender {
        fail_first: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl OutboundSender for FlakySender {
        async fn send(&self, _record: &ReplyRecord) -> Result<(), SendError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(SendError(format!("transient failure {n}")))
            } else {
                Ok(())
            }
        }
    }

    fn record() -> ReplyRecord {
        ReplyRecord {
            conversation_id: "c1".into(),
            message_id: Uuid::new_v4(),
            intent: Intent::Unknown,
            template_id: "fallback".into(),
            rendered_text: "hi".into(),
            disposition: ReplyDisposition::DefaultFallback,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let sender = RetryingSender::new(
            FlakySender {
                fail_first: 2,
                calls: AtomicU32::new(0),
            },
            5,
            Duration::ZERO,
        );
        sender.send(&record()).await.unwrap();
        assert_eq!(sender.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let sender = RetryingSender::new(
            FlakySender {
                fail_first: u32::MAX,
                calls: AtomicU32::new(0),
            },
            3,
            Duration::ZERO,
        );
        assert!(sender.send(&record()).await.is_err());
        assert_eq!(sender.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_max_attempts_still_tries_once() {
        let sender = RetryingSender::new(
            FlakySender {
                fail_first: 0,
                calls: AtomicU32::new(0),
            },
            0,
            Duration::ZERO,
        );
        sender.send(&record()).await.unwrap();
        assert_eq!(sender.inner.calls.load(Ordering::SeqCst), 1);
    }
}
