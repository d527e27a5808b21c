//! Bounded polling shared by element resolution, assertions and save-state sync

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::E2eResult;

/// Outcome of a bounded poll
#[derive(Debug, Clone, PartialEq)]
pub enum Polled<T> {
    /// The condition held; carries the observed value
    Ready(T),
    /// The deadline passed before the condition held
    TimedOut { attempts: usize, waited: Duration },
}

impl<T> Polled<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Polled::Ready(_))
    }
}

/// A deadline plus a polling interval.
///
/// The check always runs at least once, so a condition that already holds
/// returns without sleeping.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Poller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Poll `check` until it yields `Some`, errors, or the deadline passes
    pub async fn until<T, F, Fut>(&self, mut check: F) -> E2eResult<Polled<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<Option<T>>>,
    {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;
            if let Some(value) = check().await? {
                return Ok(Polled::Ready(value));
            }

            let waited = start.elapsed();
            if waited >= self.timeout {
                return Ok(Polled::TimedOut { attempts, waited });
            }

            let remaining = self.timeout - waited;
            sleep(self.interval.min(remaining)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn ready_condition_checks_once() {
        let calls = AtomicUsize::new(0);
        let poller = Poller::new(Duration::from_secs(5), Duration::from_millis(10));
        let outcome = poller
            .until(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(Some(42)) }
            })
            .await
            .unwrap();
        assert_eq!(outcome, Polled::Ready(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_deadline() {
        let poller = Poller::new(Duration::from_millis(300), Duration::from_millis(100));
        let outcome: Polled<()> = poller.until(|| async { Ok(None) }).await.unwrap();
        match outcome {
            Polled::TimedOut { attempts, waited } => {
                assert!(attempts >= 3);
                assert!(waited >= Duration::from_millis(300));
            }
            Polled::Ready(_) => panic!("condition never holds"),
        }
    }

    #[tokio::test]
    async fn errors_abort_polling() {
        let poller = Poller::new(Duration::from_secs(5), Duration::from_millis(10));
        let result: E2eResult<Polled<()>> = poller
            .until(|| async { Err(crate::error::E2eError::Driver("gone".into())) })
            .await;
        assert!(result.is_err());
    }
}
