use anyhow::{Context, Result};
use clap::Parser;
use netcap_control::{
    ControlPlane, InMemoryControlPlane, InMemoryLogReader, LogReader,
    RestConfig, RestControlPlane, RestLogReader,
};
use netcap_observability::{TracingConfig, setup_tracing};
use netcap_orchestrator::{
    Cli, ConfigError, EngineError, FORCED_EXIT_CODE, RunConfig, RunReport,
    Runner, escalate_interrupts, interrupt_signals, token_source_from_env,
};
use std::process::ExitCode;
use std::{env, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let json_format = env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() != "plain")
        .unwrap_or(true);
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let tracing_config = TracingConfig::from_env("netcap", &log_level, json_format);
    if let Err(e) = setup_tracing(tracing_config) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(EngineError::Config(e @ ConfigError::Missing(_))) => {
            error!(event = "missing_flags", message = %e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!(event = "fatal", error = %e);
            return ExitCode::FAILURE;
        }
    };

    match run(&config).await {
        Ok(report) => ExitCode::from(report.verdict().exit_code()),
        Err(e) => {
            error!(event = "fatal", error = %format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &RunConfig) -> Result<RunReport> {
    let (control, logs) = build_clients(config)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if escalate_interrupts(interrupt_signals(), cancel).await {
                std::process::exit(FORCED_EXIT_CODE);
            }
        }
    });

    let runner = Runner::new(config, control, logs).with_cancellation(cancel);
    let report = runner
        .run()
        .await
        .with_context(|| format!("{:?} run failed", config.mode))?;
    Ok(report)
}

fn build_clients(
    config: &RunConfig,
) -> Result<(Arc<dyn ControlPlane>, Arc<dyn LogReader>)> {
    if config.dry_run {
        info!(event = "dry_run", message = "using in-memory control plane");
        let control: Arc<dyn ControlPlane> = Arc::new(InMemoryControlPlane::new());
        let logs: Arc<dyn LogReader> = Arc::new(InMemoryLogReader::default());
        return Ok((control, logs));
    }
    let rest = RestConfig {
        endpoint: config.api_endpoint.clone(),
        ..Default::default()
    };
    let control = RestControlPlane::new(rest, token_source_from_env())
        .context("building control-plane client")?;
    let logs = RestLogReader::new(
        config.logging_endpoint.clone(),
        token_source_from_env(),
    )
    .context("building logging client")?;
    let control: Arc<dyn ControlPlane> = Arc::new(control);
    let logs: Arc<dyn LogReader> = Arc::new(logs);
    Ok((control, logs))
}
