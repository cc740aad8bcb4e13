use anyhow::Context;
use netcap_checker::{CheckerConfig, CheckerError, CheckerSettings, run_checker};
use netcap_control::{RestConfig, RestControlPlane};
use netcap_observability::{TracingConfig, setup_tracing};
use netcap_orchestrator::{EngineError, token_source_from_env};
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let log_level =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let tracing_config =
        TracingConfig::from_env("netcap-checker", &log_level, true);
    if let Err(e) = setup_tracing(tracing_config) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let settings = match CheckerConfig::load_from_env().and_then(CheckerConfig::settings) {
        Ok(s) => s,
        Err(e @ CheckerError::MissingEnv(_)) => {
            error!(event = "missing_env", message = %e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!(event = "fatal", error = %e);
            return ExitCode::FAILURE;
        }
    };

    match run(&settings).await {
        Ok(code) => code,
        Err(e) => {
            error!(event = "fatal", error = %format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: &CheckerSettings) -> anyhow::Result<ExitCode> {
    let control = RestControlPlane::new(
        RestConfig {
            endpoint: settings.api_endpoint.clone(),
            ..Default::default()
        },
        token_source_from_env(),
    )
    .context("building control-plane client")?;

    match run_checker(settings, &control).await {
        Ok(report) => Ok(ExitCode::from(report.verdict().exit_code())),
        // already reported as list_services_failed / no_services
        Err(EngineError::DiscoveryFailed(_) | EngineError::NoServices(_)) => {
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
