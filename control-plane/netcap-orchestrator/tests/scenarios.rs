mod common;

use common::{orchestrator, run_config};
use netcap_control::{ControlPlane, Fault, InMemoryControlPlane, InMemoryLogReader, LogReader};
use netcap_models::{ExecutionSummary, Outcome};
use netcap_orchestrator::{
    Phase, ProbeConfig, Prober, RunMode, Runner, VerifyMode, discover,
    verify_services,
};
use netcap_test_utils::{TEST_PARENT, mount_ping, service_template};
use std::sync::Arc;
use wiremock::MockServer;

fn clients(
    cp: &Arc<InMemoryControlPlane>,
) -> (Arc<dyn ControlPlane>, Arc<dyn LogReader>) {
    (cp.clone(), Arc::new(InMemoryLogReader::default()))
}

#[tokio::test]
async fn all_creates_and_probes_succeed() {
    let server = MockServer::start().await;
    for i in 0..5 {
        mount_ping(&server, &format!("svc-{:03}", i), 200, "ok").await;
    }
    let cp = Arc::new(InMemoryControlPlane::new().with_uri_base(server.uri()));
    let (control, logs) = clients(&cp);
    let config = run_config(RunMode::Deploy, VerifyMode::Local);

    let report = Runner::new(&config, control, logs).run().await.unwrap();

    let deploy = report.phase(Phase::Deploy).unwrap();
    assert_eq!(deploy.summary.total(), 5);
    assert_eq!(deploy.summary.succeeded(), 5);
    assert_eq!(deploy.summary.failed(), 0);
    assert_eq!(deploy.summary.skipped(), 0);
    let verify = report.phase(Phase::Verify).unwrap();
    assert_eq!(verify.summary.passed(), 5);
    assert_eq!(report.verdict().exit_code(), 0);
}

#[tokio::test]
async fn one_transient_create_failure_is_retried() {
    let cp = Arc::new(InMemoryControlPlane::new());
    cp.fail_create("svc-002", Fault::Provision("revision not ready".into()));
    let (control, logs) = clients(&cp);
    let config = run_config(RunMode::Deploy, VerifyMode::Remote);

    let runner = Runner::new(&config, control, logs);
    let deploy = runner.deploy().await.unwrap();

    assert_eq!(deploy.summary.succeeded(), 5);
    assert_eq!(deploy.summary.failed(), 0);
    assert_eq!(deploy.rounds.len(), 2);
    assert_eq!(deploy.rounds[1].submitted, vec!["svc-002"]);
    assert_eq!(cp.create_calls("svc-002"), 2);
}

#[tokio::test]
async fn one_failing_probe_fails_verification() {
    let server = MockServer::start().await;
    let cp = Arc::new(InMemoryControlPlane::new());
    for (i, status) in [200u16, 200, 500].into_iter().enumerate() {
        let name = format!("svc-{:03}", i);
        mount_ping(&server, &name, status, "body").await;
        cp.insert_service(
            TEST_PARENT,
            &name,
            &format!("{}/{}", server.uri(), name),
            service_template(),
        );
    }
    let prober = Prober::new(ProbeConfig::default()).unwrap();

    let report = verify_services(cp.as_ref(), TEST_PARENT, "svc", &prober)
        .await
        .unwrap();

    assert_eq!(report.summary.total(), 3);
    assert_eq!(report.summary.passed(), 2);
    assert_eq!(report.summary.failed(), 1);
    assert_ne!(report.verdict().exit_code(), 0);
}

#[tokio::test]
async fn delete_with_one_target_already_gone() {
    let cp = Arc::new(InMemoryControlPlane::new());
    cp.insert_service(TEST_PARENT, "svc-000", "https://a", service_template());
    cp.insert_service(TEST_PARENT, "svc-001", "https://b", service_template());
    let resources = discover(cp.as_ref(), TEST_PARENT, "svc").await.unwrap();
    cp.remove_service(TEST_PARENT, "svc-000");

    let results = orchestrator(&cp, 2).delete(&resources).await;
    let summary = ExecutionSummary::from_results(&results);

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.failed(), 0);
    assert_eq!(results[0].outcome, Outcome::Skipped);
}

#[tokio::test]
async fn deploy_failure_stops_before_verification() {
    let cp = Arc::new(InMemoryControlPlane::new());
    for _ in 0..4 {
        cp.fail_create("svc-004", Fault::Submit("quota".into()));
    }
    let (control, logs) = clients(&cp);
    let config = run_config(RunMode::Deploy, VerifyMode::Remote);

    let report = Runner::new(&config, control, logs).run().await.unwrap();

    assert_eq!(report.phases.len(), 1);
    assert_eq!(report.phases[0].summary.failed(), 1);
    assert_eq!(report.verdict().exit_code(), 1);
    assert!(!cp.has_job("projects/proj/locations/us-central1/jobs/checker"));
}

#[tokio::test]
async fn remote_verification_runs_checker_job() {
    let cp = Arc::new(InMemoryControlPlane::new());
    let (control, logs) = clients(&cp);
    let config = run_config(RunMode::VerifyOnly, VerifyMode::Remote);

    let report = Runner::new(&config, control, logs)
        .with_log_sink(|_| {})
        .run()
        .await
        .unwrap();

    let run = report.phase(Phase::CheckerRun).unwrap();
    assert_eq!(run.summary.succeeded(), 1);
    assert!(report.verdict().is_success());
    assert!(cp.has_job("projects/proj/locations/us-central1/jobs/checker"));
}

#[tokio::test]
async fn local_verification_without_services_is_fatal() {
    let cp = Arc::new(InMemoryControlPlane::new());
    let (control, logs) = clients(&cp);
    let config = run_config(RunMode::VerifyOnly, VerifyMode::Local);
    let err = Runner::new(&config, control, logs).run().await.unwrap_err();
    assert!(matches!(err, netcap_orchestrator::EngineError::NoServices(_)));
}

#[tokio::test]
async fn cleanup_removes_services_and_checker_job() {
    let cp = Arc::new(InMemoryControlPlane::new());
    let (control, logs) = clients(&cp);
    let deploy = run_config(RunMode::Deploy, VerifyMode::Remote);
    Runner::new(&deploy, control.clone(), logs.clone())
        .with_log_sink(|_| {})
        .run()
        .await
        .unwrap();
    assert_eq!(cp.service_names().len(), 5);

    let cleanup = run_config(RunMode::Cleanup, VerifyMode::Remote);
    let report = Runner::new(&cleanup, control, logs).run().await.unwrap();

    let delete = report.phase(Phase::Delete).unwrap();
    assert_eq!(delete.summary.succeeded(), 5);
    assert!(cp.service_names().is_empty());
    assert!(!cp.has_job("projects/proj/locations/us-central1/jobs/checker"));
}

#[tokio::test]
async fn negative_count_is_rejected_before_any_call() {
    let cp = Arc::new(InMemoryControlPlane::new());
    let (control, logs) = clients(&cp);
    let mut config = run_config(RunMode::Deploy, VerifyMode::Remote);
    config.count = -3;
    let err = Runner::new(&config, control, logs).run().await.unwrap_err();
    assert!(matches!(err, netcap_orchestrator::EngineError::InvalidArgument(_)));
    assert!(cp.calls().is_empty());
}
