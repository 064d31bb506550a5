//! Caller-level retry around a [`UnitProcessor`].
//!
//! The pipeline itself never retries a generator call. `Retrying` re-runs a
//! whole unit when it ended `Failed` with a transient failure kind, waiting
//! through an injected delay function between attempts.

use std::time::Duration;

use docgate_core::{Decision, DocumentableUnit, OutcomeRecord, Usage};
use tracing::{debug, warn};

use crate::orchestrator::{UnitContext, UnitProcessor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, doubling from `base_delay`.
    ///
    /// ```
    /// use std::time::Duration;
    /// use docgate_pipeline::RetryPolicy;
    ///
    /// let policy = RetryPolicy {
    ///     max_attempts: 5,
    ///     base_delay: Duration::from_millis(100),
    ///     max_delay: Duration::from_millis(250),
    /// };
    /// assert_eq!(policy.backoff(1), Duration::from_millis(100));
    /// assert_eq!(policy.backoff(2), Duration::from_millis(200));
    /// assert_eq!(policy.backoff(3), Duration::from_millis(250));
    /// ```
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// Retries transient unit failures of the wrapped processor.
pub struct Retrying<P, D> {
    inner: P,
    policy: RetryPolicy,
    delay: D,
}

impl<P, D> Retrying<P, D>
where
    P: UnitProcessor,
    D: Fn(Duration) + Send + Sync,
{
    /// Wraps `inner`; `delay` is called with each backoff duration (the CLI
    /// passes `std::thread::sleep`).
    pub fn new(inner: P, policy: RetryPolicy, delay: D) -> Self {
        Self {
            inner,
            policy,
            delay,
        }
    }
}

impl<P, D> UnitProcessor for Retrying<P, D>
where
    P: UnitProcessor,
    D: Fn(Duration) + Send + Sync,
{
    fn process_unit(&self, unit: &DocumentableUnit, ctx: &UnitContext<'_>) -> OutcomeRecord {
        let mut spent = Usage::default();
        let mut attempt = 1;

        loop {
            let mut record = self.inner.process_unit(unit, ctx);
            let transient = record.decision == Decision::Failed
                && record.failure.as_ref().is_some_and(|f| f.kind.is_transient());

            if !transient || attempt >= self.policy.max_attempts {
                if transient {
                    warn!(unit = %unit.id(), attempt, "giving up after transient failures");
                }
                record.usage += spent;
                return record;
            }

            spent += record.usage;
            let wait = self.policy.backoff(attempt);
            debug!(unit = %unit.id(), attempt, ?wait, "retrying after transient failure");
            (self.delay)(wait);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use docgate_core::{FailureDetail, FailureKind, HeuristicVerdict, Stage};

    use super::*;
    use crate::test_support::method_unit;

    /// Fails with the scripted kinds, then keeps the unit.
    struct Flaky {
        failures: Mutex<Vec<FailureKind>>,
        attempts: Mutex<u32>,
    }

    impl Flaky {
        fn new(mut failures: Vec<FailureKind>) -> Self {
            failures.reverse();
            Self {
                failures: Mutex::new(failures),
                attempts: Mutex::new(0),
            }
        }

        fn attempts(&self) -> u32 {
            *self.attempts.lock().unwrap()
        }
    }

    impl UnitProcessor for Flaky {
        fn process_unit(&self, unit: &DocumentableUnit, _ctx: &UnitContext<'_>) -> OutcomeRecord {
            *self.attempts.lock().unwrap() += 1;
            let usage = Usage {
                calls: 1,
                ..Usage::default()
            };
            match self.failures.lock().unwrap().pop() {
                Some(kind) => OutcomeRecord::failed(
                    unit.clone(),
                    None,
                    None,
                    FailureDetail {
                        stage: Stage::Classifier,
                        kind,
                        message: kind.to_string(),
                    },
                    usage,
                ),
                None => {
                    let mut record =
                        OutcomeRecord::kept(unit.clone(), HeuristicVerdict::Pass, None);
                    record.usage = usage;
                    record
                }
            }
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<Duration>>>, impl Fn(Duration) + Send + Sync) {
        let waits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&waits);
        (waits, move |d| sink.lock().unwrap().push(d))
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(15),
        }
    }

    #[test]
    fn test_transient_failure_retried_until_success() {
        let (waits, delay) = recorder();
        let retrying = Retrying::new(
            Flaky::new(vec![FailureKind::Timeout, FailureKind::RateLimited]),
            policy(),
            delay,
        );
        let ctx = UnitContext::new("");
        let record = retrying.process_unit(&method_unit("run", 20), &ctx);
        assert_eq!(record.decision, Decision::Kept);
        assert_eq!(record.usage.calls, 3);
        assert_eq!(retrying.inner.attempts(), 3);
        assert_eq!(
            *waits.lock().unwrap(),
            vec![Duration::from_millis(10), Duration::from_millis(15)]
        );
    }

    #[test]
    fn test_malformed_response_not_retried() {
        let (waits, delay) = recorder();
        let retrying = Retrying::new(
            Flaky::new(vec![FailureKind::MalformedResponse]),
            policy(),
            delay,
        );
        let record = retrying.process_unit(&method_unit("run", 20), &UnitContext::new(""));
        assert_eq!(record.decision, Decision::Failed);
        assert_eq!(retrying.inner.attempts(), 1);
        assert!(waits.lock().unwrap().is_empty());
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let (_waits, delay) = recorder();
        let retrying = Retrying::new(
            Flaky::new(vec![FailureKind::Transport; 5]),
            policy(),
            delay,
        );
        let record = retrying.process_unit(&method_unit("run", 20), &UnitContext::new(""));
        assert_eq!(record.decision, Decision::Failed);
        assert_eq!(record.failure.unwrap().kind, FailureKind::Transport);
        assert_eq!(retrying.inner.attempts(), 3);
        assert_eq!(record.usage.calls, 3);
    }

    #[test]
    fn test_none_policy_runs_once() {
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
