//! Fan-out Runner: independent sub-tasks with ordered, never-dropped outcomes
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use crate::error::{panic_message, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollUp {
    AllSucceeded,
    PartialFailure,
    AllFailed,
}

/// Outcomes of one fan-out, in input order.
#[derive(Debug)]
pub struct FanOutReport<T> {
    outcomes: Vec<Result<T, ErrorKind>>,
}

impl<T> FanOutReport<T> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_err()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.len() - self.failed()
    }

    pub fn outcomes(&self) -> &[Result<T, ErrorKind>] {
        &self.outcomes
    }

    /// An empty fan-out has nothing that failed.
    pub fn rollup(&self) -> RollUp {
        match self.failed() {
            0 => RollUp::AllSucceeded,
            n if n == self.len() => RollUp::AllFailed,
            _ => RollUp::PartialFailure,
        }
    }

    /// Error the enclosing stage should report, if any unit failed.
    pub fn failure(&self) -> Option<ErrorKind> {
        match self.rollup() {
            RollUp::AllSucceeded => None,
            RollUp::PartialFailure => Some(ErrorKind::PartialFailure {
                failed: self.failed(),
                total: self.len(),
            }),
            RollUp::AllFailed => Some(ErrorKind::AllFailed { total: self.len() }),
        }
    }

    pub fn into_outcomes(self) -> Vec<Result<T, ErrorKind>> {
        self.outcomes
    }
}

/// Runs units with bounded concurrency.
///
/// Each unit gets its own timeout and panic guard, so a unit can only ever
/// fail itself. Results come back in input order regardless of completion
/// order.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    max_concurrency: usize,
    unit_timeout: Duration,
}

impl FanOut {
    pub fn new(max_concurrency: usize, unit_timeout: Duration) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            unit_timeout,
        }
    }

    pub fn sequential(unit_timeout: Duration) -> Self {
        Self::new(1, unit_timeout)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, worker: F) -> FanOutReport<T>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, ErrorKind>>,
    {
        let width = items.len().clamp(1, self.max_concurrency);
        let unit_timeout = self.unit_timeout;

        let units = items.into_iter().map(|item| {
            let unit = AssertUnwindSafe(worker(item)).catch_unwind();
            async move {
                match tokio::time::timeout(unit_timeout, unit).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(panic)) => Err(ErrorKind::Unexpected(panic_message(panic.as_ref()))),
                    Err(_) => Err(ErrorKind::Timeout(unit_timeout.as_millis() as u64)),
                }
            }
        });

        // `buffered` keeps input order, unlike `buffer_unordered`
        let outcomes = stream::iter(units).buffered(width).collect().await;
        FanOutReport { outcomes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_order_follows_input_not_completion() {
        let fanout = FanOut::new(3, Duration::from_secs(5));
        let report = fanout
            .run(vec![30u64, 10, 20], |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, ErrorKind>(delay)
            })
            .await;

        let values: Vec<_> = report.into_outcomes().into_iter().map(|o| o.unwrap()).collect();
        assert_eq!(values, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_siblings() {
        let fanout = FanOut::new(2, Duration::from_secs(5));
        let report = fanout
            .run(vec!["hi", "ta", "he"], |code| async move {
                if code == "he" {
                    Err(ErrorKind::Provider("model down".into()))
                } else {
                    Ok(code.to_uppercase())
                }
            })
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(report.rollup(), RollUp::PartialFailure);
        assert_eq!(
            report.failure(),
            Some(ErrorKind::PartialFailure { failed: 1, total: 3 })
        );
        assert_eq!(report.outcomes()[0], Ok("HI".to_string()));
        assert_eq!(report.outcomes()[1], Ok("TA".to_string()));
        assert!(report.outcomes()[2].is_err());
    }

    #[tokio::test]
    async fn test_all_failed_rollup() {
        let fanout = FanOut::sequential(Duration::from_secs(5));
        let report = fanout
            .run(vec![1, 2], |_| async { Err::<(), _>(ErrorKind::EmptyResult) })
            .await;
        assert_eq!(report.rollup(), RollUp::AllFailed);
        assert_eq!(report.failure(), Some(ErrorKind::AllFailed { total: 2 }));
    }

    #[tokio::test]
    async fn test_empty_fanout_succeeds() {
        let fanout = FanOut::new(4, Duration::from_secs(1));
        let report = fanout
            .run(Vec::<u8>::new(), |_| async { Ok::<_, ErrorKind>(()) })
            .await;
        assert!(report.is_empty());
        assert_eq!(report.rollup(), RollUp::AllSucceeded);
        assert!(report.failure().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_unit_times_out_alone() {
        let fanout = FanOut::new(2, Duration::from_millis(100));
        let report = fanout
            .run(vec![10u64, 10_000], |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, ErrorKind>(delay)
            })
            .await;

        assert_eq!(report.outcomes()[0], Ok(10));
        assert_eq!(report.outcomes()[1], Err(ErrorKind::Timeout(100)));
    }

    #[tokio::test]
    async fn test_panicking_unit_is_captured() {
        let fanout = FanOut::new(2, Duration::from_secs(1));
        let report = fanout
            .run(vec![1, 2, 3], |n| async move {
                if n == 2 {
                    panic!("renderer exploded");
                }
                Ok::<_, ErrorKind>(n)
            })
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(
            report.outcomes()[1],
            Err(ErrorKind::Unexpected("renderer exploded".into()))
        );
        assert_eq!(report.succeeded(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let fanout = FanOut::new(2, Duration::from_secs(5));

        let report = fanout
            .run((0..6).collect(), |_| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ErrorKind>(())
                }
            })
            .await;

        assert_eq!(report.succeeded(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
