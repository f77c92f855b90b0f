//! Binary entrypoint: `newsdesk [--config <file>] [--once]`.
use anyhow::Context;
use clap::Parser;
use newsdesk_daemon::{
    config::DaemonConfig, init_tracing, metrics::Metrics, serve, signal,
    wiring::build_collaborators, AppState, PipelineJob,
};
use newsdesk_schedule::{Scheduler, SystemClock};
use newsdesk_stages::build_pipeline;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Daily financial news summary pipeline.
#[derive(Parser, Debug)]
#[command(name = "newsdesk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "newsdesk.yaml")]
    config: PathBuf,

    /// Run the pipeline once, print the result as JSON and exit.
    #[arg(long)]
    once: bool,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = DaemonConfig::load(Some(&cli.config))
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let collaborators = build_collaborators(&config).context("building collaborators")?;
    let runner = build_pipeline(&config.pipeline, &collaborators);

    let metrics = Metrics::new().context("registering metrics")?;
    let state = AppState::new(metrics, runner.pipeline_id());
    let job = Arc::new(PipelineJob::new(runner, state.clone()));

    let shutdown = CancellationToken::new();
    signal::cancel_on_signal(shutdown.clone());

    if cli.once {
        let result = job.run_once(&shutdown).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(if result.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let server = config.status.addr.clone().map(|addr| {
        let state = state.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = serve(&addr, state, shutdown).await {
                error!(addr = %addr, error = %e, "Status server failed");
            }
        })
    });

    info!(
        version = newsdesk_core::NEWSDESK_VERSION,
        trigger = %config.schedule.trigger,
        "newsdesk starting"
    );
    let scheduler = Scheduler::new(config.schedule.clone(), Arc::new(SystemClock), job);
    let report = scheduler.run(shutdown.clone()).await;

    shutdown.cancel();
    if let Some(server) = server {
        server.await.context("status server task")?;
    }

    info!(
        fires = report.fired(),
        failed = report.failed(),
        "newsdesk stopped"
    );
    Ok(ExitCode::SUCCESS)
}
