//! Newsdesk Schedule: fires a job once per day at a configured local time
//!
//! ```text
//! Clock ──now()──▶ ScheduleState ──next_ready()──▶ ScheduledJob::run()
//!   ▲                 (claims, queue, retries)             │
//!   └──────────── sleep(poll_interval) ◀───────────────────┘
//! ```
//!
//! At most one run is in flight; triggers crossed meanwhile are queued and run
//! once it finishes.

pub mod clock;
pub mod error;
pub mod retry;
pub mod scheduler;
pub mod state;
pub mod trigger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ScheduleError;
pub use retry::RetryPolicy;
pub use scheduler::{
    FireContext, FireRecord, JobOutcome, ScheduleConfig, ScheduledJob, Scheduler,
    SchedulerReport, RECENT_FIRES,
};
pub use state::{PendingRun, ScheduleState};
pub use trigger::DailyTrigger;
