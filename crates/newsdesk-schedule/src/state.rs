//! Pure scheduling state: which days have been claimed and what is queued.
//!
//! The async loop feeds it the current time and whether a run is in flight;
//! it never touches a runtime, so every rule here is unit-testable.
//!
//! Rules:
//! - a day's trigger is claimed at most once, the first time `now` is at or
//!   past the trigger instant on that day
//! - claimed fires queue up while a run is in flight and are released one at
//!   a time once it finishes
//! - retries re-enter the queue with a `not_before` and never add a claim

use chrono::{Days, NaiveDate, NaiveDateTime};
use std::collections::VecDeque;

use crate::retry::RetryPolicy;
use crate::trigger::DailyTrigger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRun {
    pub day: NaiveDate,
    /// 1-based
    pub attempt: u32,
    pub not_before: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct ScheduleState {
    trigger: DailyTrigger,
    last_claimed: Option<NaiveDate>,
    queue: VecDeque<PendingRun>,
}

impl ScheduleState {
    /// Starting after today's trigger counts today as passed unless `catch_up_on_start`.
    pub fn new(trigger: DailyTrigger, now: NaiveDateTime, catch_up_on_start: bool) -> Self {
        let today = now.date();
        let last_claimed = if now >= trigger.on(today) && !catch_up_on_start {
            Some(today)
        } else {
            today.checked_sub_days(Days::new(1))
        };

        Self {
            trigger,
            last_claimed,
            queue: VecDeque::new(),
        }
    }

    /// Claim today's fire if the trigger has been crossed. Returns true on a new claim.
    pub fn observe(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date();
        if now < self.trigger.on(today) {
            return false;
        }
        if self.last_claimed.is_some_and(|claimed| claimed >= today) {
            return false;
        }

        self.last_claimed = Some(today);
        self.queue.push_back(PendingRun {
            day: today,
            attempt: 1,
            not_before: now,
        });
        true
    }

    /// Next run to start, if nothing is in flight and one is due.
    pub fn next_ready(&mut self, now: NaiveDateTime, in_flight: bool) -> Option<PendingRun> {
        if in_flight {
            return None;
        }
        let index = self.queue.iter().position(|run| run.not_before <= now)?;
        self.queue.remove(index)
    }

    /// Queue another attempt for a failed run when the policy allows it.
    pub fn schedule_retry(
        &mut self,
        failed: &PendingRun,
        policy: &RetryPolicy,
        now: NaiveDateTime,
    ) -> Option<PendingRun> {
        if !policy.allows_retry_after(failed.attempt) {
            return None;
        }
        let delay = chrono::Duration::from_std(policy.delay()).unwrap_or_else(|_| chrono::Duration::zero());
        let retry = PendingRun {
            day: failed.day,
            attempt: failed.attempt + 1,
            not_before: now + delay,
        };
        self.queue.push_back(retry.clone());
        Some(retry)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn last_claimed(&self) -> Option<NaiveDate> {
        self.last_claimed
    }

    /// Next trigger instant strictly after the last claim.
    pub fn next_trigger(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        match self.last_claimed {
            Some(claimed) if claimed >= today => {
                self.trigger.on(today.succ_opt().unwrap_or(today))
            }
            _ => self.trigger.on(today),
        }
    }
}
