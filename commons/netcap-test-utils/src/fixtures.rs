use netcap_models::{DiscoveredResource, ServiceSpec};

pub const TEST_PROJECT: &str = "proj";
pub const TEST_REGION: &str = "us-central1";
pub const TEST_PARENT: &str = "projects/proj/locations/us-central1";

/// Service template as the orchestrator would build it for a test run.
pub fn service_template() -> ServiceSpec {
    ServiceSpec::internal_probe_service(
        "us-docker.pkg.dev/proj/netcap/service:test",
        "test-net",
        "test-subnet",
        "http://10.10.0.2:8080",
    )
}

/// A discovered service reachable at `uri`.
pub fn discovered(short_name: &str, uri: &str) -> DiscoveredResource {
    DiscoveredResource::from_name(
        format!("{}/services/{}", TEST_PARENT, short_name),
        uri,
    )
}
