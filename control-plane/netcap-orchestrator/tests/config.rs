use clap::Parser;
use netcap_orchestrator::{
    Cli, ConfigError, EngineError, RunMode, VerifyMode,
};
use netcap_test_utils::Env;
use std::time::Duration;

const BASE: &[&str] = &[
    "netcap",
    "--project",
    "proj",
    "--region",
    "us-central1",
    "--network",
    "net",
    "--subnet",
    "sub",
    "--target-url",
    "http://10.0.0.2:8080",
];

fn parse(extra: &[&str]) -> Result<netcap_orchestrator::RunConfig, EngineError> {
    let args: Vec<&str> = BASE.iter().chain(extra.iter()).copied().collect();
    Cli::try_parse_from(args).unwrap().into_config()
}

fn missing(result: Result<netcap_orchestrator::RunConfig, EngineError>) -> Vec<String> {
    match result {
        Err(EngineError::Config(ConfigError::Missing(flags))) => flags,
        other => panic!("expected missing flags, got {:?}", other),
    }
}

#[test]
fn reports_every_missing_flag_in_order() {
    let _env = Env::new().clear_prefixed("NETCAP_");
    let result = Cli::try_parse_from(["netcap"]).unwrap().into_config();
    assert_eq!(
        missing(result),
        vec![
            "--project",
            "--region",
            "--network",
            "--subnet",
            "--target-url",
            "--service-image",
            "--checker-image",
        ]
    );
}

#[test]
fn required_images_depend_on_mode() {
    let _env = Env::new().clear_prefixed("NETCAP_");
    assert_eq!(missing(parse(&[])), vec!["--service-image", "--checker-image"]);
    assert_eq!(missing(parse(&["--verify-only"])), vec!["--checker-image"]);
    assert_eq!(
        missing(parse(&["--verify-mode", "local"])),
        vec!["--service-image"]
    );

    let cleanup = parse(&["--cleanup"]).unwrap();
    assert_eq!(cleanup.mode, RunMode::Cleanup);
    let local = parse(&["--verify-only", "--verify-mode", "local"]).unwrap();
    assert_eq!(local.mode, RunMode::VerifyOnly);
    assert_eq!(local.verify_mode, VerifyMode::Local);
}

#[test]
fn blank_values_count_as_missing() {
    let _env = Env::new().clear_prefixed("NETCAP_");
    let result = Cli::try_parse_from([
        "netcap",
        "--cleanup",
        "--project",
        " ",
        "--region",
        "r",
        "--network",
        "n",
        "--subnet",
        "s",
        "--target-url",
        "",
    ])
    .unwrap()
    .into_config();
    assert_eq!(missing(result), vec!["--project", "--target-url"]);
}

#[test]
fn padded_values_are_trimmed() {
    let _env = Env::new().clear_prefixed("NETCAP_");
    let config = parse(&["--service-image", " img:1 ", "--checker-image", "c"]).unwrap();
    assert_eq!(config.service_image.as_deref(), Some("img:1"));
}

#[test]
fn defaults_match_documented_values() {
    let _env = Env::new().clear_prefixed("NETCAP_");
    let config = parse(&["--service-image", "s", "--checker-image", "c"]).unwrap();
    assert_eq!(config.mode, RunMode::Deploy);
    assert_eq!(config.count, 10);
    assert_eq!(config.prefix, "service");
    assert_eq!(config.concurrency, 10);
    assert_eq!(config.batch_size, 50);
    assert_eq!(config.submit_delay, Duration::ZERO);
    assert_eq!(config.retry.max_retry_rounds, 3);
    assert_eq!(config.retry.backoff, Duration::from_secs(30));
    assert_eq!(config.probe_concurrency, 10);
    assert_eq!(config.probe_timeout, Duration::from_secs(10));
    assert_eq!(config.log_ingestion_delay, Duration::from_secs(10));
    assert_eq!(config.verify_mode, VerifyMode::Remote);
    assert_eq!(config.parent(), "projects/proj/locations/us-central1");
}

#[test]
fn flags_fall_back_to_environment() {
    let _env = Env::new()
        .clear_prefixed("NETCAP_")
        .set("NETCAP_SERVICE_IMAGE", "env-service")
        .set("NETCAP_CHECKER_IMAGE", "env-checker")
        .set("NETCAP_COUNT", "250")
        .set("NETCAP_DRY_RUN", "true");
    let config = parse(&[]).unwrap();
    assert_eq!(config.service_image.as_deref(), Some("env-service"));
    assert_eq!(config.count, 250);
    assert!(config.dry_run);
}

#[test]
fn zero_concurrency_fails_validation() {
    let _env = Env::new().clear_prefixed("NETCAP_");
    let result = parse(&["--cleanup", "--concurrency", "0"]);
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

#[test]
fn negative_count_parses_for_later_rejection() {
    let _env = Env::new().clear_prefixed("NETCAP_");
    let config = parse(&["--cleanup", "--count", "-5"]).unwrap();
    assert_eq!(config.count, -5);
}

#[test]
fn checker_job_carries_run_settings() {
    let _env = Env::new().clear_prefixed("NETCAP_");
    let config = parse(&["--verify-only", "--checker-image", "c", "--prefix", "cap"]).unwrap();
    let job = config.checker_job().unwrap();
    let container = &job.template.template.containers[0];
    assert_eq!(container.env_value("PREFIX"), Some("cap"));
    assert_eq!(container.env_value("PROJECT_ID"), Some("proj"));
    assert_eq!(container.env_value("CONCURRENCY"), Some("10"));
    assert_eq!(job.template.task_count, 1);
    assert_eq!(job.template.template.max_retries, 0);
    assert!(config.service_template().is_err());
}
