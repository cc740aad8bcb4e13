use envconfig::Envconfig;
use netcap_control::DEFAULT_RUN_ENDPOINT;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Error, Debug)]
pub enum CheckerError {
    #[error("required environment variables not set: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("Environment error: {0}")]
    Env(#[from] envconfig::Error),
}

/// Raw environment of the checker job.
#[derive(Debug, Clone, Envconfig)]
pub struct CheckerConfig {
    #[envconfig(from = "PROJECT_ID")]
    pub project_id: Option<String>,

    #[envconfig(from = "REGION")]
    pub region: Option<String>,

    #[envconfig(from = "PREFIX")]
    pub prefix: Option<String>,

    /// Parsed leniently, see [`parse_concurrency`].
    #[envconfig(from = "CONCURRENCY")]
    pub concurrency: Option<String>,

    #[envconfig(from = "PROBE_TIMEOUT_SECS", default = "10")]
    pub probe_timeout_secs: u64,

    #[envconfig(from = "NETCAP_API_ENDPOINT")]
    pub api_endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerSettings {
    pub project_id: String,
    pub region: String,
    pub prefix: String,
    pub concurrency: usize,
    pub probe_timeout: Duration,
    pub api_endpoint: String,
}

/// Anything that is not a positive integer yields `default`.
pub fn parse_concurrency(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(default)
}

/// Trimmed value, or `None` when unset or blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CheckerConfig {
    pub fn load_from_env() -> Result<Self, CheckerError> {
        Ok(Self::init_from_env()?)
    }

    pub fn settings(self) -> Result<CheckerSettings, CheckerError> {
        let project_id = present(self.project_id);
        let region = present(self.region);
        let prefix = present(self.prefix);
        match (project_id, region, prefix) {
            (Some(project_id), Some(region), Some(prefix)) => Ok(CheckerSettings {
                project_id,
                region,
                prefix,
                concurrency: parse_concurrency(
                    self.concurrency.as_deref(),
                    DEFAULT_CONCURRENCY,
                ),
                probe_timeout: Duration::from_secs(self.probe_timeout_secs),
                api_endpoint: present(self.api_endpoint)
                    .unwrap_or_else(|| DEFAULT_RUN_ENDPOINT.to_string()),
            }),
            (project_id, region, prefix) => {
                let missing = [
                    ("PROJECT_ID", project_id.is_none()),
                    ("REGION", region.is_none()),
                    ("PREFIX", prefix.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name.to_string())
                .collect();
                Err(CheckerError::MissingEnv(missing))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_falls_back_on_bad_input() {
        assert_eq!(parse_concurrency(None, 10), 10);
        assert_eq!(parse_concurrency(Some(""), 10), 10);
        assert_eq!(parse_concurrency(Some("abc"), 10), 10);
        assert_eq!(parse_concurrency(Some("0"), 10), 10);
        assert_eq!(parse_concurrency(Some("-4"), 10), 10);
        assert_eq!(parse_concurrency(Some("25"), 10), 25);
    }

    #[test]
    fn blank_values_count_as_missing() {
        assert_eq!(present(Some("   ".to_string())), None);
        assert_eq!(present(Some(" svc ".to_string())).as_deref(), Some("svc"));
        assert_eq!(present(None), None);
    }
}
