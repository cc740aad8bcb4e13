use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::event_format::EventFormat;

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub service_name: String,
    pub log_level: String,
    pub json_format: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "netcap".to_string(),
            log_level: "info".to_string(),
            json_format: true,
        }
    }
}

impl TracingConfig {
    pub fn from_env(service_name: &str, log_level: &str, json_format: bool) -> Self {
        Self {
            service_name: service_name.to_string(),
            log_level: log_level.to_string(),
            json_format,
        }
    }
}

/// Installs the global subscriber. Events go to stdout; in JSON mode each
/// event is one line in the structured event schema.
pub fn setup_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json_format {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(EventFormat::new())
                    .with_writer(std::io::stdout),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stdout),
            )
            .try_init()
    };
    result.map_err(|e| TracingError::Setup(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing setup error: {0}")]
    Setup(String),
}
