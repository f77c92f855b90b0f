//! Cooperative daily scheduler loop.
//!
//! Each tick: reap a finished run, claim today's trigger if crossed, start the
//! next queued run when nothing is in flight, then sleep for the poll interval
//! (or until the in-flight run ends, or shutdown). On shutdown the loop stops
//! claiming and waits for the in-flight run before returning.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::ScheduleError;
use crate::retry::RetryPolicy;
use crate::state::{PendingRun, ScheduleState};
use crate::trigger::DailyTrigger;

/// Upper bound on the poll interval
pub const MAX_POLL_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub trigger: DailyTrigger,
    pub poll_interval_secs: u64,
    pub catch_up_on_start: bool,
    pub retry: RetryPolicy,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            trigger: DailyTrigger::default(),
            poll_interval_secs: MAX_POLL_INTERVAL_SECS,
            catch_up_on_start: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(ScheduleError::invalid(
                "poll_interval_secs",
                format!("must be between 1 and {MAX_POLL_INTERVAL_SECS}"),
            ));
        }
        self.retry.validate()
    }
}

/// What the job is told about the fire it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireContext {
    pub day: NaiveDate,
    pub attempt: u32,
    pub started_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    async fn run(&self, fire: FireContext, shutdown: CancellationToken) -> JobOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireRecord {
    pub day: NaiveDate,
    pub attempt: u32,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub outcome: JobOutcome,
}

/// Fires kept in [`SchedulerReport::recent`].
pub const RECENT_FIRES: usize = 32;

/// Counters over the scheduler's lifetime plus the most recent fires.
#[derive(Debug, Clone, Default)]
pub struct SchedulerReport {
    fired: usize,
    failed: usize,
    recent: VecDeque<FireRecord>,
}

impl SchedulerReport {
    pub fn record(&mut self, record: FireRecord) {
        self.fired += 1;
        if !record.outcome.is_success() {
            self.failed += 1;
        }
        if self.recent.len() == RECENT_FIRES {
            self.recent.pop_front();
        }
        self.recent.push_back(record);
    }

    pub fn fired(&self) -> usize {
        self.fired
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Oldest first, at most [`RECENT_FIRES`].
    pub fn recent(&self) -> &VecDeque<FireRecord> {
        &self.recent
    }
}

struct InFlight {
    run: PendingRun,
    started_at: NaiveDateTime,
    handle: JoinHandle<JobOutcome>,
}

pub struct Scheduler<C: Clock> {
    config: ScheduleConfig,
    clock: Arc<C>,
    job: Arc<dyn ScheduledJob>,
}

impl<C: Clock + 'static> Scheduler<C> {
    pub fn new(config: ScheduleConfig, clock: Arc<C>, job: Arc<dyn ScheduledJob>) -> Self {
        Self { config, clock, job }
    }

    pub async fn run(&self, shutdown: CancellationToken) -> SchedulerReport {
        let mut state = ScheduleState::new(
            self.config.trigger,
            self.clock.now(),
            self.config.catch_up_on_start,
        );
        let mut in_flight: Option<InFlight> = None;
        let mut report = SchedulerReport::default();

        info!(
            trigger = %self.config.trigger,
            next = %state.next_trigger(self.clock.now()),
            poll_interval_secs = self.config.poll_interval_secs,
            "Scheduler started"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let now = self.clock.now();
            if state.observe(now) {
                if in_flight.is_some() {
                    warn!(now = %now, "Trigger crossed while a run is in flight, deferring");
                } else {
                    info!(now = %now, "Trigger crossed");
                }
            }

            if let Some(run) = state.next_ready(now, in_flight.is_some()) {
                in_flight = Some(self.start(run, now, &shutdown));
            }

            let joined = tokio::select! {
                _ = shutdown.cancelled() => None,
                _ = self.clock.sleep(self.config.poll_interval()) => None,
                joined = wait_for(&mut in_flight) => Some(joined),
            };

            let finished = joined.and_then(|joined| in_flight.take().map(|run| (run, joined)));
            if let Some((finished, joined)) = finished {
                let record = self.finish(finished, joined);
                if !record.outcome.is_success() {
                    let failed = PendingRun {
                        day: record.day,
                        attempt: record.attempt,
                        not_before: record.finished_at,
                    };
                    if let Some(retry) =
                        state.schedule_retry(&failed, &self.config.retry, record.finished_at)
                    {
                        info!(
                            day = %retry.day,
                            attempt = retry.attempt,
                            not_before = %retry.not_before,
                            "Retry scheduled"
                        );
                    }
                }
                report.record(record);
            }
        }

        if let Some(mut finished) = in_flight.take() {
            info!(day = %finished.run.day, "Shutdown requested, waiting for in-flight run");
            let joined = (&mut finished.handle).await;
            report.record(self.finish(finished, joined));
        }

        info!(
            fires = report.fired(),
            failed = report.failed(),
            "Scheduler stopped"
        );
        report
    }

    fn start(&self, run: PendingRun, now: NaiveDateTime, shutdown: &CancellationToken) -> InFlight {
        info!(day = %run.day, attempt = run.attempt, "Starting scheduled run");
        let job = Arc::clone(&self.job);
        let fire = FireContext {
            day: run.day,
            attempt: run.attempt,
            started_at: now,
        };
        let token = shutdown.child_token();
        let handle = tokio::spawn(async move { job.run(fire, token).await });

        InFlight {
            run,
            started_at: now,
            handle,
        }
    }

    fn finish(&self, finished: InFlight, joined: Result<JobOutcome, JoinError>) -> FireRecord {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => JobOutcome::Failed(format!("job panicked: {e}")),
            Err(e) => JobOutcome::Failed(format!("job aborted: {e}")),
        };

        match &outcome {
            JobOutcome::Succeeded => {
                info!(day = %finished.run.day, attempt = finished.run.attempt, "Scheduled run succeeded")
            }
            JobOutcome::Failed(reason) => error!(
                day = %finished.run.day,
                attempt = finished.run.attempt,
                reason = %reason,
                "Scheduled run failed"
            ),
        }

        FireRecord {
            day: finished.run.day,
            attempt: finished.run.attempt,
            started_at: finished.started_at,
            finished_at: self.clock.now(),
            outcome,
        }
    }
}

async fn wait_for(in_flight: &mut Option<InFlight>) -> Result<JobOutcome, JoinError> {
    match in_flight {
        Some(running) => (&mut running.handle).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    /// Records fires; the first fire can be held on `gate` or made to panic.
    #[derive(Default)]
    struct RecordingJob {
        fires: Mutex<Vec<FireContext>>,
        gate: Option<Arc<Notify>>,
        fail_first_day_attempts: Vec<u32>,
        panic_on_first: bool,
    }

    impl RecordingJob {
        fn fires(&self) -> Vec<FireContext> {
            self.fires.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScheduledJob for RecordingJob {
        async fn run(&self, fire: FireContext, _shutdown: CancellationToken) -> JobOutcome {
            let first = {
                let mut fires = self.fires.lock().unwrap();
                fires.push(fire.clone());
                fires.len() == 1
            };
            if first {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                if self.panic_on_first {
                    panic!("renderer exploded");
                }
            }
            if fire.day == day(1) && self.fail_first_day_attempts.contains(&fire.attempt) {
                return JobOutcome::Failed("provider down".into());
            }
            JobOutcome::Succeeded
        }
    }

    async fn wait_until(clock: &ManualClock, until: NaiveDateTime) {
        while clock.now() < until {
            tokio::task::yield_now().await;
        }
    }

    fn spawn_scheduler(
        config: ScheduleConfig,
        clock: Arc<ManualClock>,
        job: Arc<RecordingJob>,
        shutdown: CancellationToken,
    ) -> JoinHandle<SchedulerReport> {
        let scheduler = Scheduler::new(config, clock, job);
        tokio::spawn(async move { scheduler.run(shutdown).await })
    }

    #[tokio::test]
    async fn test_fires_once_per_day() {
        let clock = Arc::new(ManualClock::new(at(1, 16, 0)));
        let job = Arc::new(RecordingJob::default());
        let shutdown = CancellationToken::new();
        let handle = spawn_scheduler(
            ScheduleConfig::default(),
            Arc::clone(&clock),
            Arc::clone(&job),
            shutdown.clone(),
        );

        wait_until(&clock, at(3, 20, 0)).await;
        shutdown.cancel();
        let report = handle.await.unwrap();

        let days: Vec<_> = job.fires().iter().map(|f| f.day).collect();
        assert_eq!(days, [day(1), day(2), day(3)]);
        assert!(job.fires().iter().all(|f| f.started_at.time() >= at(1, 16, 30).time()));
        assert_eq!(report.fired(), 3);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_trigger_during_run_deferred_then_runs_once() {
        let clock = Arc::new(ManualClock::new(at(1, 16, 0)));
        let gate = Arc::new(Notify::new());
        let job = Arc::new(RecordingJob {
            gate: Some(Arc::clone(&gate)),
            ..RecordingJob::default()
        });
        let shutdown = CancellationToken::new();
        let handle = spawn_scheduler(
            ScheduleConfig::default(),
            Arc::clone(&clock),
            Arc::clone(&job),
            shutdown.clone(),
        );

        // day 1 run is still holding when day 2's trigger passes
        wait_until(&clock, at(2, 17, 0)).await;
        assert_eq!(job.fires().len(), 1);

        gate.notify_one();
        wait_until(&clock, at(2, 23, 0)).await;
        shutdown.cancel();
        let report = handle.await.unwrap();

        let fires = job.fires();
        assert_eq!(fires.len(), 2);
        assert_eq!(fires[1].day, day(2));
        assert!(fires[1].started_at > at(2, 17, 0));
        assert_eq!(report.fired(), 2);
    }

    #[tokio::test]
    async fn test_failure_and_panic_do_not_stop_the_loop() {
        let clock = Arc::new(ManualClock::new(at(1, 16, 0)));
        let job = Arc::new(RecordingJob {
            panic_on_first: true,
            ..RecordingJob::default()
        });
        let shutdown = CancellationToken::new();
        let handle = spawn_scheduler(
            ScheduleConfig::default(),
            Arc::clone(&clock),
            Arc::clone(&job),
            shutdown.clone(),
        );

        wait_until(&clock, at(2, 20, 0)).await;
        shutdown.cancel();
        let report = handle.await.unwrap();

        assert_eq!(report.fired(), 2);
        assert!(matches!(&report.recent()[0].outcome, JobOutcome::Failed(r) if r.contains("panicked")));
        assert_eq!(report.recent()[1].outcome, JobOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let clock = Arc::new(ManualClock::new(at(1, 16, 0)));
        let job = Arc::new(RecordingJob {
            fail_first_day_attempts: vec![1],
            ..RecordingJob::default()
        });
        let config = ScheduleConfig {
            retry: RetryPolicy::new(3, Duration::from_secs(600)),
            ..ScheduleConfig::default()
        };
        let shutdown = CancellationToken::new();
        let handle = spawn_scheduler(config, Arc::clone(&clock), Arc::clone(&job), shutdown.clone());

        wait_until(&clock, at(1, 23, 0)).await;
        shutdown.cancel();
        let report = handle.await.unwrap();

        let attempts: Vec<_> = job.fires().iter().map(|f| (f.day, f.attempt)).collect();
        assert_eq!(attempts, [(day(1), 1), (day(1), 2)]);
        assert!(job.fires()[1].started_at >= job.fires()[0].started_at + chrono::Duration::minutes(10));
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_run() {
        let clock = Arc::new(ManualClock::new(at(1, 16, 0)));
        let gate = Arc::new(Notify::new());
        let job = Arc::new(RecordingJob {
            gate: Some(Arc::clone(&gate)),
            ..RecordingJob::default()
        });
        let shutdown = CancellationToken::new();
        let handle = spawn_scheduler(
            ScheduleConfig::default(),
            Arc::clone(&clock),
            Arc::clone(&job),
            shutdown.clone(),
        );

        wait_until(&clock, at(1, 16, 45)).await;
        shutdown.cancel();
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        gate.notify_one();
        let report = handle.await.unwrap();
        assert_eq!(report.fired(), 1);
        assert_eq!(report.recent()[0].outcome, JobOutcome::Succeeded);
    }

    #[test]
    fn test_report_keeps_counters_and_bounded_history() {
        let mut report = SchedulerReport::default();
        for n in 0..(RECENT_FIRES as u32 + 8) {
            report.record(FireRecord {
                day: day(1),
                attempt: n + 1,
                started_at: at(1, 16, 30),
                finished_at: at(1, 16, 40),
                outcome: if n % 2 == 0 {
                    JobOutcome::Succeeded
                } else {
                    JobOutcome::Failed("collect failed".into())
                },
            });
        }

        assert_eq!(report.fired(), RECENT_FIRES + 8);
        assert_eq!(report.failed(), (RECENT_FIRES + 8) / 2);
        assert_eq!(report.recent().len(), RECENT_FIRES);
        assert_eq!(report.recent()[0].attempt, 9);
    }

    #[test]
    fn test_config_validation() {
        assert!(ScheduleConfig::default().validate().is_ok());
        let slow = ScheduleConfig {
            poll_interval_secs: 300,
            ..ScheduleConfig::default()
        };
        assert!(slow.validate().is_err());
    }
}
