//! Mock `/ping` endpoints for prober tests.

use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts `GET /<name>/ping` answering with `status` and `body`.
pub async fn mount_ping(server: &MockServer, name: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/ping", name)))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts a `/ping` that answers 200 only after `delay`.
pub async fn mount_slow_ping(server: &MockServer, name: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/ping", name)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Base URI under which `name` answers `/ping`.
pub fn service_uri(server: &MockServer, name: &str) -> String {
    format!("{}/{}", server.uri(), name)
}
