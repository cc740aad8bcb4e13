use async_trait::async_trait;
use futures_util::stream::BoxStream;
use netcap_models::{JobSpec, ServiceSpec};

use crate::error::ControlResult;
use crate::types::{LogEntry, Operation, OperationOutput, ServiceDescriptor};

/// Lazy sequence of listed services. Pages are fetched as the stream is
/// polled; calling `list_services` again restarts from the first page.
pub type ServiceStream<'a> = BoxStream<'a, ControlResult<ServiceDescriptor>>;

#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create_service(
        &self,
        parent: &str,
        service_id: &str,
        spec: &ServiceSpec,
    ) -> ControlResult<Operation>;

    async fn delete_service(&self, name: &str) -> ControlResult<Operation>;

    fn list_services<'a>(&'a self, parent: &'a str) -> ServiceStream<'a>;

    /// Blocks until the operation is terminal.
    async fn wait_operation(
        &self,
        operation: &Operation,
    ) -> ControlResult<OperationOutput>;

    async fn create_job(
        &self,
        parent: &str,
        job_id: &str,
        spec: &JobSpec,
    ) -> ControlResult<Operation>;

    async fn update_job(
        &self,
        name: &str,
        spec: &JobSpec,
    ) -> ControlResult<Operation>;

    async fn delete_job(&self, name: &str) -> ControlResult<Operation>;

    async fn run_job(&self, name: &str) -> ControlResult<Operation>;
}

#[async_trait]
pub trait LogReader: Send + Sync {
    async fn read_entries(
        &self,
        project: &str,
        filter: &str,
    ) -> ControlResult<Vec<LogEntry>>;
}
