use clap::ValueEnum;
use netcap_control::{
    DEFAULT_LOGGING_ENDPOINT, DEFAULT_RUN_ENDPOINT, METADATA_TOKEN_URL,
    TokenSource, parent,
};
use netcap_models::{JobSpec, ServiceSpec};
use std::time::Duration;
use validator::Validate;

use crate::errors::{ConfigError, EngineResult};
use crate::lifecycle::LifecycleConfig;
use crate::poller::{PollerConfig, checker_env};
use crate::prober::ProbeConfig;
use crate::retry::RetryPolicy;

/// Env var holding a pre-issued bearer token.
pub const ACCESS_TOKEN_ENV: &str = "NETCAP_ACCESS_TOKEN";

/// Concurrency the remote checker probes with.
pub const CHECKER_CONCURRENCY: usize = 10;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerifyMode {
    /// Run the checker as a job inside the subnet.
    #[default]
    Remote,
    /// Probe from this process.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Deploy,
    VerifyOnly,
    Cleanup,
}

/// Command line of the `netcap` binary. Every flag can also come from a
/// `NETCAP_*` variable.
#[derive(clap::Parser, Clone, Debug)]
#[clap(name = "netcap", author, version, about = "Subnet capacity test orchestrator", long_about = None)]
pub struct Cli {
    /// GCP project id
    #[arg(long, env = "NETCAP_PROJECT")]
    pub project: Option<String>,
    /// GCP region
    #[arg(long, env = "NETCAP_REGION")]
    pub region: Option<String>,
    /// VPC network name
    #[arg(long, env = "NETCAP_NETWORK")]
    pub network: Option<String>,
    /// Subnet name
    #[arg(long, env = "NETCAP_SUBNET")]
    pub subnet: Option<String>,
    /// Internal address of the target every service forwards to
    #[arg(long, env = "NETCAP_TARGET_URL")]
    pub target_url: Option<String>,
    /// Container image of the provisioned services
    #[arg(long, env = "NETCAP_SERVICE_IMAGE")]
    pub service_image: Option<String>,
    /// Container image of the checker job
    #[arg(long, env = "NETCAP_CHECKER_IMAGE")]
    pub checker_image: Option<String>,
    /// Number of services to deploy
    #[arg(long, env = "NETCAP_COUNT", default_value_t = 10, allow_negative_numbers = true)]
    pub count: i64,
    /// Service name prefix
    #[arg(long, env = "NETCAP_PREFIX", default_value = "service")]
    pub prefix: String,
    /// Lifecycle operations in flight at once
    #[arg(long, env = "NETCAP_CONCURRENCY", default_value_t = 10)]
    pub concurrency: usize,
    /// Targets per submit-then-wait batch
    #[arg(long, env = "NETCAP_BATCH_SIZE", default_value_t = 50)]
    pub batch_size: usize,
    /// Pause between successive submissions
    #[arg(long, env = "NETCAP_SUBMIT_DELAY_MS", default_value_t = 0)]
    pub submit_delay_ms: u64,
    /// Retry rounds after the initial one
    #[arg(long, env = "NETCAP_MAX_RETRY_ROUNDS", default_value_t = 3)]
    pub max_retry_rounds: u32,
    /// Backoff before each retry round
    #[arg(long, env = "NETCAP_RETRY_BACKOFF_SECS", default_value_t = 30)]
    pub retry_backoff_secs: u64,
    /// Probes in flight at once for local verification
    #[arg(long, env = "NETCAP_PROBE_CONCURRENCY", default_value_t = 10)]
    pub probe_concurrency: usize,
    /// Per-probe timeout
    #[arg(long, env = "NETCAP_PROBE_TIMEOUT_SECS", default_value_t = 10)]
    pub probe_timeout_secs: u64,
    /// Wait before reading the checker's logs
    #[arg(long, env = "NETCAP_LOG_DELAY_SECS", default_value_t = 10)]
    pub log_delay_secs: u64,
    #[arg(long, env = "NETCAP_VERIFY_MODE", value_enum, default_value_t = VerifyMode::Remote)]
    pub verify_mode: VerifyMode,
    /// Delete all services and the checker job
    #[arg(long, env = "NETCAP_CLEANUP")]
    pub cleanup: bool,
    /// Skip deployment, only verify
    #[arg(long, env = "NETCAP_VERIFY_ONLY")]
    pub verify_only: bool,
    /// Run against an in-memory control plane
    #[arg(long, env = "NETCAP_DRY_RUN")]
    pub dry_run: bool,
    #[arg(long, env = "NETCAP_API_ENDPOINT", default_value = DEFAULT_RUN_ENDPOINT)]
    pub api_endpoint: String,
    #[arg(long, env = "NETCAP_LOGGING_ENDPOINT", default_value = DEFAULT_LOGGING_ENDPOINT)]
    pub logging_endpoint: String,
}

/// Validated, immutable settings of one run.
#[derive(Debug, Clone, Validate)]
pub struct RunConfig {
    pub project: String,
    pub region: String,
    pub network: String,
    pub subnet: String,
    pub target_url: String,
    pub service_image: Option<String>,
    pub checker_image: Option<String>,
    pub count: i64,
    #[validate(length(min = 1))]
    pub prefix: String,
    #[validate(range(min = 1))]
    pub concurrency: usize,
    #[validate(range(min = 1))]
    pub batch_size: usize,
    pub submit_delay: Duration,
    pub retry: RetryPolicy,
    #[validate(range(min = 1))]
    pub probe_concurrency: usize,
    pub probe_timeout: Duration,
    pub log_ingestion_delay: Duration,
    pub verify_mode: VerifyMode,
    pub mode: RunMode,
    pub dry_run: bool,
    #[validate(url)]
    pub api_endpoint: String,
    #[validate(url)]
    pub logging_endpoint: String,
}

/// Trimmed value, or `None` when unset or blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Cli {
    pub fn mode(&self) -> RunMode {
        if self.cleanup {
            RunMode::Cleanup
        } else if self.verify_only {
            RunMode::VerifyOnly
        } else {
            RunMode::Deploy
        }
    }

    /// Checks required flags for the selected mode and freezes the result.
    pub fn into_config(self) -> EngineResult<RunConfig> {
        let mode = self.mode();
        let needs_service_image = mode == RunMode::Deploy;
        let needs_checker_image =
            mode != RunMode::Cleanup && self.verify_mode == VerifyMode::Remote;

        let project = present(self.project);
        let region = present(self.region);
        let network = present(self.network);
        let subnet = present(self.subnet);
        let target_url = present(self.target_url);
        let service_image = present(self.service_image);
        let checker_image = present(self.checker_image);

        let mut missing = Vec::new();
        for (flag, value) in [
            ("--project", &project),
            ("--region", &region),
            ("--network", &network),
            ("--subnet", &subnet),
            ("--target-url", &target_url),
        ] {
            if value.is_none() {
                missing.push(flag.to_string());
            }
        }
        if needs_service_image && service_image.is_none() {
            missing.push("--service-image".to_string());
        }
        if needs_checker_image && checker_image.is_none() {
            missing.push("--checker-image".to_string());
        }
        let (
            Some(project),
            Some(region),
            Some(network),
            Some(subnet),
            Some(target_url),
        ) = (project, region, network, subnet, target_url)
        else {
            return Err(ConfigError::Missing(missing).into());
        };
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing).into());
        }

        let config = RunConfig {
            project,
            region,
            network,
            subnet,
            target_url,
            service_image,
            checker_image,
            count: self.count,
            prefix: self.prefix,
            concurrency: self.concurrency,
            batch_size: self.batch_size,
            submit_delay: Duration::from_millis(self.submit_delay_ms),
            retry: RetryPolicy {
                max_retry_rounds: self.max_retry_rounds,
                backoff: Duration::from_secs(self.retry_backoff_secs),
            },
            probe_concurrency: self.probe_concurrency,
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            log_ingestion_delay: Duration::from_secs(self.log_delay_secs),
            verify_mode: self.verify_mode,
            mode,
            dry_run: self.dry_run,
            api_endpoint: self.api_endpoint,
            logging_endpoint: self.logging_endpoint,
        };
        config.validate()?;
        Ok(config)
    }
}

impl RunConfig {
    pub fn parent(&self) -> String {
        parent(&self.project, &self.region)
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            parent: self.parent(),
            batch_size: self.batch_size,
            concurrency: self.concurrency,
            submit_delay: self.submit_delay,
        }
    }

    pub fn probe(&self) -> ProbeConfig {
        ProbeConfig {
            concurrency: self.probe_concurrency,
            timeout: self.probe_timeout,
            ..Default::default()
        }
    }

    pub fn poller(&self) -> PollerConfig {
        PollerConfig {
            project: self.project.clone(),
            parent: self.parent(),
            log_ingestion_delay: self.log_ingestion_delay,
        }
    }

    pub fn service_template(&self) -> EngineResult<ServiceSpec> {
        let image = self.service_image.as_deref().ok_or_else(|| {
            ConfigError::Missing(vec!["--service-image".to_string()])
        })?;
        Ok(ServiceSpec::internal_probe_service(
            image,
            &self.network,
            &self.subnet,
            &self.target_url,
        ))
    }

    pub fn checker_job(&self) -> EngineResult<JobSpec> {
        let image = self.checker_image.as_deref().ok_or_else(|| {
            ConfigError::Missing(vec!["--checker-image".to_string()])
        })?;
        Ok(JobSpec::checker(
            image,
            &self.network,
            &self.subnet,
            checker_env(
                &self.project,
                &self.region,
                &self.prefix,
                CHECKER_CONCURRENCY,
            ),
        ))
    }
}

/// Bearer token source for REST clients: an explicit token from
/// [`ACCESS_TOKEN_ENV`], else the instance metadata server.
pub fn token_source_from_env() -> TokenSource {
    match std::env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.is_empty() => TokenSource::Static(token),
        _ => TokenSource::metadata(METADATA_TOKEN_URL),
    }
}
