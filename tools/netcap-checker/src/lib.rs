//! Connectivity checker run as a batch job inside the test subnet.

pub mod config;

pub use config::{CheckerConfig, CheckerError, CheckerSettings, parse_concurrency};

use netcap_control::{ControlPlane, parent};
use netcap_orchestrator::{EngineResult, PhaseReport, ProbeConfig, Prober, verify_services};
use tracing::info;

/// Probes every service of the run once and reports the tally.
pub async fn run_checker(
    settings: &CheckerSettings,
    control: &dyn ControlPlane,
) -> EngineResult<PhaseReport> {
    info!(
        event = "startup",
        project_id = %settings.project_id,
        region = %settings.region,
        prefix = %settings.prefix,
        concurrency = settings.concurrency
    );
    let prober = Prober::new(ProbeConfig {
        concurrency: settings.concurrency,
        timeout: settings.probe_timeout,
        ..Default::default()
    })?;
    verify_services(
        control,
        &parent(&settings.project_id, &settings.region),
        &settings.prefix,
        &prober,
    )
    .await
}
