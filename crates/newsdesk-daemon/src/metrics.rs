//! Prometheus metrics for pipeline runs, served at `/metrics`.
use newsdesk_core::{RunResult, StageStatus};
use prometheus::{Encoder, Gauge, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    runs_total: IntCounterVec,
    stage_failures_total: IntCounterVec,
    last_run_duration_seconds: Gauge,
    last_success_timestamp_seconds: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("newsdesk".to_string()), None)?;

        let runs_total = IntCounterVec::new(
            Opts::new("runs_total", "Pipeline runs by overall status"),
            &["status"],
        )?;
        let stage_failures_total = IntCounterVec::new(
            Opts::new("stage_failures_total", "Failed stage outcomes by stage"),
            &["stage"],
        )?;
        let last_run_duration_seconds = Gauge::new(
            "last_run_duration_seconds",
            "Wall time of the most recent run",
        )?;
        let last_success_timestamp_seconds = Gauge::new(
            "last_success_timestamp_seconds",
            "Start time of the most recent succeeded run, unix seconds",
        )?;

        registry.register(Box::new(runs_total.clone()))?;
        registry.register(Box::new(stage_failures_total.clone()))?;
        registry.register(Box::new(last_run_duration_seconds.clone()))?;
        registry.register(Box::new(last_success_timestamp_seconds.clone()))?;

        Ok(Self {
            registry,
            runs_total,
            stage_failures_total,
            last_run_duration_seconds,
            last_success_timestamp_seconds,
        })
    }

    pub fn observe(&self, result: &RunResult) {
        self.runs_total
            .with_label_values(&[result.overall_status().as_str()])
            .inc();

        for outcome in result.stage_outcomes() {
            if outcome.status == StageStatus::Failed {
                self.stage_failures_total
                    .with_label_values(&[outcome.stage_name()])
                    .inc();
            }
        }

        self.last_run_duration_seconds
            .set(result.duration_ms() as f64 / 1000.0);
        if result.is_success() {
            self.last_success_timestamp_seconds
                .set(result.started_at().timestamp() as f64);
        }
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
