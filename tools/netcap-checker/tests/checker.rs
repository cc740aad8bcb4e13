use netcap_checker::{CheckerConfig, CheckerError, CheckerSettings, run_checker};
use netcap_control::InMemoryControlPlane;
use netcap_orchestrator::EngineError;
use netcap_test_utils::{
    Env, TEST_PARENT, TEST_PROJECT, TEST_REGION, mount_ping, service_template,
};
use std::time::Duration;
use wiremock::MockServer;

const CHECKER_VARS: &[&str] = &[
    "PROJECT_ID",
    "REGION",
    "PREFIX",
    "CONCURRENCY",
    "PROBE_TIMEOUT_SECS",
    "NETCAP_API_ENDPOINT",
];

fn clean_env() -> Env {
    CHECKER_VARS.iter().fold(Env::new(), |env, k| env.unset(k))
}

fn settings() -> CheckerSettings {
    CheckerSettings {
        project_id: TEST_PROJECT.to_string(),
        region: TEST_REGION.to_string(),
        prefix: "svc".to_string(),
        concurrency: 4,
        probe_timeout: Duration::from_secs(2),
        api_endpoint: "http://unused".to_string(),
    }
}

#[test]
fn settings_come_from_environment() {
    let _env = clean_env()
        .set("PROJECT_ID", "proj")
        .set("REGION", "us-central1")
        .set("PREFIX", "svc")
        .set("CONCURRENCY", "not-a-number");
    let settings = CheckerConfig::load_from_env().unwrap().settings().unwrap();
    assert_eq!(settings.prefix, "svc");
    assert_eq!(settings.concurrency, 10);
    assert_eq!(settings.probe_timeout, Duration::from_secs(10));
    assert_eq!(settings.api_endpoint, "https://run.googleapis.com");
}

#[test]
fn blank_prefix_is_reported_missing() {
    let _env = clean_env()
        .set("PROJECT_ID", "proj")
        .set("REGION", " us-central1 ")
        .set("PREFIX", "   ");
    let err = CheckerConfig::load_from_env()
        .unwrap()
        .settings()
        .unwrap_err();
    match err {
        CheckerError::MissingEnv(vars) => assert_eq!(vars, vec!["PREFIX"]),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn all_missing_variables_are_reported() {
    let _env = clean_env().set("REGION", "us-central1");
    let err = CheckerConfig::load_from_env()
        .unwrap()
        .settings()
        .unwrap_err();
    match err {
        CheckerError::MissingEnv(vars) => assert_eq!(vars, vec!["PROJECT_ID", "PREFIX"]),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn tallies_probe_results() {
    let server = MockServer::start().await;
    let cp = InMemoryControlPlane::new();
    for (name, status) in [("svc-000", 200u16), ("svc-001", 502), ("svc-002", 200)] {
        mount_ping(&server, name, status, "body").await;
        cp.insert_service(
            TEST_PARENT,
            name,
            &format!("{}/{}", server.uri(), name),
            service_template(),
        );
    }
    cp.insert_service(TEST_PARENT, "unrelated", "http://x", service_template());

    let report = run_checker(&settings(), &cp).await.unwrap();
    assert_eq!(report.summary.total(), 3);
    assert_eq!(report.summary.passed(), 2);
    assert_eq!(report.summary.failed(), 1);
    assert_eq!(report.verdict().exit_code(), 1);
}

#[tokio::test]
async fn no_matching_services_is_an_error() {
    let cp = InMemoryControlPlane::new();
    let err = run_checker(&settings(), &cp).await.unwrap_err();
    assert!(matches!(err, EngineError::NoServices(_)));
}

#[tokio::test]
async fn listing_failure_is_an_error() {
    let cp = InMemoryControlPlane::new();
    cp.fail_listing("denied");
    let err = run_checker(&settings(), &cp).await.unwrap_err();
    assert!(matches!(err, EngineError::DiscoveryFailed(_)));
}
