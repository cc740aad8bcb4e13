mod common;

use common::orchestrator;
use netcap_control::{Fault, InMemoryControlPlane};
use netcap_models::{ExecutionSummary, Outcome};
use netcap_orchestrator::{Submission, discover, generate_targets};
use netcap_test_utils::{TEST_PARENT, service_template};
use std::sync::Arc;

#[tokio::test]
async fn create_twice_is_idempotent() {
    let cp = Arc::new(InMemoryControlPlane::new());
    let lifecycle = orchestrator(&cp, 3);
    let targets = generate_targets("svc", 4, &service_template()).unwrap();

    let first = lifecycle.create(&targets).await;
    assert!(first.iter().all(|r| r.outcome == Outcome::Succeeded));

    let second = lifecycle.create(&targets).await;
    assert!(second.iter().all(|r| r.outcome == Outcome::Skipped));
    let summary = ExecutionSummary::from_results(&second);
    assert_eq!(summary.skipped(), 4);
    assert_eq!(summary.failed(), 0);
    assert_eq!(cp.service_names().len(), 4);
}

#[tokio::test]
async fn results_follow_target_order() {
    let cp = Arc::new(InMemoryControlPlane::new());
    let lifecycle = orchestrator(&cp, 2);
    let targets = generate_targets("svc", 7, &service_template()).unwrap();
    let results = lifecycle.create(&targets).await;
    let ids: Vec<&str> = results.iter().map(|r| r.target_id.as_str()).collect();
    let expected: Vec<&str> = targets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn submission_and_provisioning_failures_keep_detail() {
    let cp = Arc::new(InMemoryControlPlane::new());
    cp.fail_create("svc-001", Fault::Submit("quota exceeded".into()));
    cp.fail_create("svc-002", Fault::Provision("image pull failed".into()));
    let lifecycle = orchestrator(&cp, 4);
    let targets = generate_targets("svc", 3, &service_template()).unwrap();

    let results = lifecycle.create(&targets).await;
    assert_eq!(results[0].outcome, Outcome::Succeeded);
    assert_eq!(results[1].outcome, Outcome::Failed);
    assert!(results[1].error.as_deref().unwrap().contains("quota exceeded"));
    assert_eq!(results[2].outcome, Outcome::Failed);
    assert!(results[2].error.as_deref().unwrap().contains("image pull failed"));
    assert!(results.iter().all(|r| r.finished_at >= r.started_at));
}

#[tokio::test]
async fn submission_phase_precedes_wait_phase() {
    let cp = Arc::new(InMemoryControlPlane::new());
    cp.fail_create("svc-000", Fault::Submit("rejected".into()));
    let lifecycle = orchestrator(&cp, 2);
    let targets = generate_targets("svc", 3, &service_template()).unwrap();

    let submitted = lifecycle.submit_create(&targets).await;
    assert_eq!(submitted.entries().len(), 3);
    assert_eq!(submitted.pending_count(), 2);
    assert!(matches!(&submitted.entries()[0], Submission::Settled(r) if r.outcome == Outcome::Failed));
    // nothing is provisioned until the operations are waited on
    assert!(cp.service_names().is_empty());

    let results = lifecycle.wait(submitted).await;
    assert_eq!(results.len(), 3);
    assert_eq!(cp.service_names().len(), 2);
}

#[tokio::test]
async fn batches_cover_every_target() {
    let cp = Arc::new(InMemoryControlPlane::new());
    let control: Arc<dyn netcap_control::ControlPlane> = cp.clone();
    let lifecycle = netcap_orchestrator::LifecycleOrchestrator::new(
        control,
        common::lifecycle_config(2, 3),
    )
    .unwrap();
    let targets = generate_targets("svc", 8, &service_template()).unwrap();
    let results = lifecycle.create(&targets).await;
    assert_eq!(results.len(), 8);
    assert_eq!(cp.service_names().len(), 8);
}

#[tokio::test]
async fn delete_of_absent_service_is_skipped() {
    let cp = Arc::new(InMemoryControlPlane::new());
    let template = service_template();
    cp.insert_service(TEST_PARENT, "svc-000", "https://a", template.clone());
    cp.insert_service(TEST_PARENT, "svc-001", "https://b", template);
    let lifecycle = orchestrator(&cp, 2);

    let resources = discover(cp.as_ref(), TEST_PARENT, "svc").await.unwrap();
    assert_eq!(resources.len(), 2);
    assert!(cp.remove_service(TEST_PARENT, "svc-001"));

    let results = lifecycle.delete(&resources).await;
    assert_eq!(results[0].outcome, Outcome::Succeeded);
    assert_eq!(results[1].outcome, Outcome::Skipped);
    assert!(cp.service_names().is_empty());
}

#[tokio::test]
async fn zero_batch_size_is_rejected() {
    let cp = Arc::new(InMemoryControlPlane::new());
    let control: Arc<dyn netcap_control::ControlPlane> = cp;
    assert!(
        netcap_orchestrator::LifecycleOrchestrator::new(
            control,
            common::lifecycle_config(2, 0)
        )
        .is_err()
    );
}
