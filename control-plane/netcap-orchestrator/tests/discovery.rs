use netcap_control::InMemoryControlPlane;
use netcap_orchestrator::{EngineError, discover};
use netcap_test_utils::{TEST_PARENT, TEST_REGION, service_template};

fn seeded(names: &[&str]) -> InMemoryControlPlane {
    let cp = InMemoryControlPlane::new().with_page_size(2);
    for name in names {
        cp.insert_service(
            TEST_PARENT,
            name,
            &format!("https://{}.run.app", name),
            service_template(),
        );
    }
    cp
}

#[tokio::test]
async fn keeps_only_prefix_dash_digits_across_pages() {
    let cp = seeded(&[
        "svc-000",
        "svc-001",
        "svc-abc",
        "svc-",
        "svcx-002",
        "other-003",
        "svc-0042",
        "svc-002-canary",
    ]);
    let found = discover(&cp, TEST_PARENT, "svc").await.unwrap();
    let names: Vec<&str> = found.iter().map(|r| r.short_name.as_str()).collect();
    assert_eq!(names, vec!["svc-000", "svc-001", "svc-0042"]);
    assert_eq!(found[0].region, TEST_REGION);
    assert_eq!(found[0].access_uri, "https://svc-000.run.app");
    assert_eq!(
        found[0].name,
        format!("{}/services/svc-000", TEST_PARENT)
    );
}

#[tokio::test]
async fn other_regions_are_not_listed() {
    let cp = seeded(&["svc-000"]);
    cp.insert_service(
        "projects/proj/locations/europe-west1",
        "svc-001",
        "https://eu",
        service_template(),
    );
    let found = discover(&cp, TEST_PARENT, "svc").await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn empty_listing_is_not_an_error() {
    let cp = seeded(&[]);
    assert!(discover(&cp, TEST_PARENT, "svc").await.unwrap().is_empty());
}

#[tokio::test]
async fn listing_error_aborts_discovery() {
    let cp = seeded(&["svc-000", "svc-001", "svc-002"]);
    cp.fail_listing("backend unavailable");
    let err = discover(&cp, TEST_PARENT, "svc").await.unwrap_err();
    assert!(matches!(err, EngineError::DiscoveryFailed(_)));
}
