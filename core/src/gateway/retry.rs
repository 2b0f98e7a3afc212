use crate::config::RetryPolicy;
use crate::gateway::TransportResult;
use crate::telemetry::{LogManager, MetricsRecorder};
use std::future::Future;
use std::sync::Arc;

/// Fixed-delay retry loop around one bridge call.
#[derive(Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    recorder: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl Retrier {
    pub fn new(policy: RetryPolicy, recorder: Arc<MetricsRecorder>) -> Self {
        Self {
            policy,
            recorder,
            logger: LogManager::new("gateway"),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `op` until it succeeds, fails permanently, or the policy's attempts
    /// are used up. Both failure cases resolve to `None`.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let attempts = self.policy.attempts();
        for attempt in 1..=attempts {
            self.recorder.record_attempt();
            match op().await {
                Ok(value) => return Some(value),
                Err(err) if err.is_transient() => {
                    if attempt < attempts {
                        self.logger.warn(&format!(
                            "{} attempt {}/{} failed ({}), retrying",
                            label, attempt, attempts, err
                        ));
                        self.recorder.record_retry();
                        tokio::time::sleep(self.policy.delay()).await;
                    } else {
                        self.logger
                            .warn(&format!("{} failed after {} attempts: {}", label, attempts, err));
                    }
                }
                Err(err) => {
                    self.logger.warn(&format!("{} rejected: {}", label, err));
                    return None;
                }
            }
        }
        self.recorder.record_exhausted();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::TransportError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn retrier(recorder: &Arc<MetricsRecorder>) -> Retrier {
        Retrier::new(RetryPolicy::default(), recorder.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let recorder = Arc::new(MetricsRecorder::new());
        let calls = AtomicUsize::new(0);
        let started = Instant::now();

        let result = retrier(&recorder)
            .run("years", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(TransportError::NotReady)
                    } else {
                        Ok(vec![2023])
                    }
                }
            })
            .await;

        assert_eq!(result, Some(vec![2023]));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(recorder.snapshot().retries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_five_attempts() {
        let recorder = Arc::new(MetricsRecorder::new());
        let calls = AtomicUsize::new(0);
        let started = Instant::now();

        let result: Option<u32> = retrier(&recorder)
            .run("dashboard", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TransportError::Failed("timeout".into())) }
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.exhausted, 1);
        assert_eq!(snapshot.fetch_attempts, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_is_not_retried() {
        let recorder = Arc::new(MetricsRecorder::new());
        let calls = AtomicUsize::new(0);

        let result: Option<u32> = retrier(&recorder)
            .run("detail", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TransportError::Rejected("bad json".into())) }
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.snapshot().exhausted, 0);
    }
}
