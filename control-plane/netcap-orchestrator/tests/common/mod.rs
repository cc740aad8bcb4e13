#![allow(dead_code)]

use netcap_control::{
    ControlPlane, DEFAULT_LOGGING_ENDPOINT, DEFAULT_RUN_ENDPOINT,
    InMemoryControlPlane,
};
use netcap_orchestrator::{
    LifecycleConfig, LifecycleOrchestrator, RetryPolicy, RunConfig, RunMode,
    VerifyMode,
};
use netcap_test_utils::{TEST_PARENT, TEST_PROJECT, TEST_REGION};
use std::sync::Arc;
use std::time::Duration;

pub fn run_config(mode: RunMode, verify_mode: VerifyMode) -> RunConfig {
    RunConfig {
        project: TEST_PROJECT.to_string(),
        region: TEST_REGION.to_string(),
        network: "test-net".to_string(),
        subnet: "test-subnet".to_string(),
        target_url: "http://10.10.0.2:8080".to_string(),
        service_image: Some("img/service:test".to_string()),
        checker_image: Some("img/checker:test".to_string()),
        count: 5,
        prefix: "svc".to_string(),
        concurrency: 2,
        batch_size: 50,
        submit_delay: Duration::ZERO,
        retry: RetryPolicy {
            max_retry_rounds: 3,
            backoff: Duration::ZERO,
        },
        probe_concurrency: 4,
        probe_timeout: Duration::from_secs(2),
        log_ingestion_delay: Duration::ZERO,
        verify_mode,
        mode,
        dry_run: true,
        api_endpoint: DEFAULT_RUN_ENDPOINT.to_string(),
        logging_endpoint: DEFAULT_LOGGING_ENDPOINT.to_string(),
    }
}

pub fn lifecycle_config(concurrency: usize, batch_size: usize) -> LifecycleConfig {
    LifecycleConfig {
        parent: TEST_PARENT.to_string(),
        batch_size,
        concurrency,
        submit_delay: Duration::ZERO,
    }
}

pub fn orchestrator(
    cp: &Arc<InMemoryControlPlane>,
    concurrency: usize,
) -> LifecycleOrchestrator {
    let control: Arc<dyn ControlPlane> = cp.clone();
    LifecycleOrchestrator::new(control, lifecycle_config(concurrency, 50)).unwrap()
}
