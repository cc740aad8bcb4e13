//! Scriptable in-process control plane.
//!
//! Backs the test suites and `--dry-run`. Faults are queued per service id and
//! consumed one per call, so "fail once then succeed" is a single
//! `fail_create` call.

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use netcap_models::{JobSpec, ServiceSpec, short_name};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{ControlPlaneError, ControlResult};
use crate::traits::{ControlPlane, LogReader, ServiceStream};
use crate::types::{
    Execution, LogEntry, Operation, OperationOutput, ServiceDescriptor,
    service_name,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The request itself is rejected.
    Submit(String),
    /// The request is accepted but the operation ends in error.
    Provision(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateService(String),
    DeleteService(String),
    ListPage(String),
    WaitOperation(String),
    CreateJob(String),
    UpdateJob(String),
    DeleteJob(String),
    RunJob(String),
}

enum Effect {
    InsertService { name: String, spec: ServiceSpec },
    RemoveService(String),
    Fail(String),
    Output(serde_json::Value),
}

#[derive(Default)]
struct State {
    services: BTreeMap<String, (ServiceSpec, String)>,
    jobs: BTreeMap<String, JobSpec>,
    operations: HashMap<String, Effect>,
    create_faults: HashMap<String, VecDeque<Fault>>,
    delete_faults: HashMap<String, VecDeque<Fault>>,
    list_error: Option<String>,
    execution_counts: (u32, u32),
    cancelled_count: u32,
    executions: u32,
    next_op: u64,
    calls: Vec<Call>,
}

impl State {
    fn operation(&mut self, effect: Effect) -> Operation {
        self.next_op += 1;
        let name = format!("operations/op-{}", self.next_op);
        self.operations.insert(name.clone(), effect);
        Operation::pending(name)
    }
}

pub struct InMemoryControlPlane {
    state: Mutex<State>,
    page_size: usize,
    latency: Duration,
    uri_base: String,
}

impl Default for InMemoryControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                execution_counts: (1, 0),
                ..Default::default()
            }),
            page_size: 2,
            latency: Duration::ZERO,
            uri_base: "https://run.internal".to_string(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay applied to every submission and wait call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Base URI for services created through `create_service`; each gets
    /// `<base>/<id>`.
    pub fn with_uri_base(mut self, base: impl Into<String>) -> Self {
        self.uri_base = base.into();
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    pub fn insert_service(&self, parent: &str, id: &str, uri: &str, spec: ServiceSpec) {
        self.lock()
            .services
            .insert(service_name(parent, id), (spec, uri.to_string()));
    }

    /// Drops a service behind the caller's back, as a concurrent actor would.
    pub fn remove_service(&self, parent: &str, id: &str) -> bool {
        self.lock()
            .services
            .remove(&service_name(parent, id))
            .is_some()
    }

    pub fn fail_create(&self, service_id: &str, fault: Fault) {
        self.lock()
            .create_faults
            .entry(service_id.to_string())
            .or_default()
            .push_back(fault);
    }

    pub fn fail_delete(&self, service_id: &str, fault: Fault) {
        self.lock()
            .delete_faults
            .entry(service_id.to_string())
            .or_default()
            .push_back(fault);
    }

    pub fn fail_listing(&self, message: &str) {
        self.lock().list_error = Some(message.to_string());
    }

    pub fn set_execution_counts(&self, succeeded: u32, failed: u32) {
        self.lock().execution_counts = (succeeded, failed);
    }

    pub fn set_cancelled_count(&self, cancelled: u32) {
        self.lock().cancelled_count = cancelled;
    }

    pub fn service_names(&self) -> Vec<String> {
        self.lock().services.keys().cloned().collect()
    }

    pub fn has_job(&self, name: &str) -> bool {
        self.lock().jobs.contains_key(name)
    }

    pub fn job(&self, name: &str) -> Option<JobSpec> {
        self.lock().jobs.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn create_calls(&self, service_id: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::CreateService(id) if id == service_id))
            .count()
    }
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    async fn create_service(
        &self,
        parent: &str,
        service_id: &str,
        spec: &ServiceSpec,
    ) -> ControlResult<Operation> {
        self.delay().await;
        let mut state = self.lock();
        state.calls.push(Call::CreateService(service_id.to_string()));
        let name = service_name(parent, service_id);
        let fault = state
            .create_faults
            .get_mut(service_id)
            .and_then(|q| q.pop_front());
        match fault {
            Some(Fault::Submit(message)) => {
                Err(ControlPlaneError::Api { status: 500, message })
            }
            Some(Fault::Provision(message)) => Ok(state.operation(Effect::Fail(message))),
            None if state.services.contains_key(&name) => {
                Err(ControlPlaneError::AlreadyExists(name))
            }
            None => Ok(state.operation(Effect::InsertService {
                name,
                spec: spec.clone(),
            })),
        }
    }

    async fn delete_service(&self, name: &str) -> ControlResult<Operation> {
        self.delay().await;
        let mut state = self.lock();
        state.calls.push(Call::DeleteService(name.to_string()));
        let fault = state
            .delete_faults
            .get_mut(short_name(name))
            .and_then(|q| q.pop_front());
        match fault {
            Some(Fault::Submit(message)) => {
                Err(ControlPlaneError::Api { status: 500, message })
            }
            Some(Fault::Provision(message)) => Ok(state.operation(Effect::Fail(message))),
            None if !state.services.contains_key(name) => {
                Err(ControlPlaneError::NotFound(name.to_string()))
            }
            None => Ok(state.operation(Effect::RemoveService(name.to_string()))),
        }
    }

    fn list_services<'a>(&'a self, parent: &'a str) -> ServiceStream<'a> {
        let prefix = format!("{}/services/", parent);
        let page_size = self.page_size;
        stream::unfold(Some(0usize), move |offset| {
            let prefix = prefix.clone();
            async move {
                let offset = offset?;
                let mut state = self.lock();
                state.calls.push(Call::ListPage(parent.to_string()));
                if let Some(message) = state.list_error.clone() {
                    return Some((
                        stream::iter(vec![Err(ControlPlaneError::Api {
                            status: 503,
                            message,
                        })]),
                        None,
                    ));
                }
                let matching: Vec<_> = state
                    .services
                    .iter()
                    .filter(|(name, _)| name.starts_with(&prefix))
                    .collect();
                if offset >= matching.len() && offset > 0 {
                    return None;
                }
                let page: Vec<ControlResult<ServiceDescriptor>> = matching
                    .iter()
                    .skip(offset)
                    .take(page_size)
                    .map(|(name, (_, uri))| {
                        Ok(ServiceDescriptor {
                            name: (*name).clone(),
                            uri: uri.clone(),
                        })
                    })
                    .collect();
                let next = offset + page_size;
                let next = (next < matching.len()).then_some(next);
                Some((stream::iter(page), next))
            }
        })
        .flatten()
        .boxed()
    }

    async fn wait_operation(
        &self,
        operation: &Operation,
    ) -> ControlResult<OperationOutput> {
        self.delay().await;
        let mut state = self.lock();
        state.calls.push(Call::WaitOperation(operation.name.clone()));
        let effect = state.operations.remove(&operation.name).ok_or_else(|| {
            ControlPlaneError::NotFound(operation.name.clone())
        })?;
        let response = match effect {
            Effect::InsertService { name, spec } => {
                let uri = format!("{}/{}", self.uri_base, short_name(&name));
                state.services.insert(name, (spec, uri));
                serde_json::Value::Null
            }
            Effect::RemoveService(name) => {
                state.services.remove(&name);
                serde_json::Value::Null
            }
            Effect::Fail(message) => {
                return Err(ControlPlaneError::OperationFailed {
                    name: operation.name.clone(),
                    code: 2,
                    message,
                });
            }
            Effect::Output(value) => value,
        };
        Ok(OperationOutput {
            name: operation.name.clone(),
            response,
        })
    }

    async fn create_job(
        &self,
        parent: &str,
        job_id: &str,
        spec: &JobSpec,
    ) -> ControlResult<Operation> {
        let mut state = self.lock();
        let name = format!("{}/jobs/{}", parent, job_id);
        state.calls.push(Call::CreateJob(name.clone()));
        if state.jobs.contains_key(&name) {
            return Err(ControlPlaneError::AlreadyExists(name));
        }
        state.jobs.insert(name, spec.clone());
        Ok(state.operation(Effect::Output(serde_json::Value::Null)))
    }

    async fn update_job(
        &self,
        name: &str,
        spec: &JobSpec,
    ) -> ControlResult<Operation> {
        let mut state = self.lock();
        state.calls.push(Call::UpdateJob(name.to_string()));
        match state.jobs.get_mut(name) {
            Some(job) => *job = spec.clone(),
            None => return Err(ControlPlaneError::NotFound(name.to_string())),
        }
        Ok(state.operation(Effect::Output(serde_json::Value::Null)))
    }

    async fn delete_job(&self, name: &str) -> ControlResult<Operation> {
        let mut state = self.lock();
        state.calls.push(Call::DeleteJob(name.to_string()));
        if state.jobs.remove(name).is_none() {
            return Err(ControlPlaneError::NotFound(name.to_string()));
        }
        Ok(state.operation(Effect::Output(serde_json::Value::Null)))
    }

    async fn run_job(&self, name: &str) -> ControlResult<Operation> {
        self.delay().await;
        let mut state = self.lock();
        state.calls.push(Call::RunJob(name.to_string()));
        if !state.jobs.contains_key(name) {
            return Err(ControlPlaneError::NotFound(name.to_string()));
        }
        state.executions += 1;
        let (succeeded, failed) = state.execution_counts;
        let execution = Execution {
            name: format!(
                "{}/executions/{}-{:05}",
                name,
                short_name(name),
                state.executions
            ),
            succeeded_count: succeeded,
            failed_count: failed,
            cancelled_count: state.cancelled_count,
        };
        let value = serde_json::to_value(&execution)?;
        Ok(state.operation(Effect::Output(value)))
    }
}

/// Log reader returning canned entries and recording the filters it saw.
#[derive(Default)]
pub struct InMemoryLogReader {
    entries: Vec<LogEntry>,
    error: Option<String>,
    filters: Mutex<Vec<String>>,
}

impl InMemoryLogReader {
    pub fn new(entries: Vec<LogEntry>) -> Self {
        Self {
            entries,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn filters(&self) -> Vec<String> {
        self.filters
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LogReader for InMemoryLogReader {
    async fn read_entries(
        &self,
        _project: &str,
        filter: &str,
    ) -> ControlResult<Vec<LogEntry>> {
        if let Ok(mut f) = self.filters.lock() {
            f.push(filter.to_string());
        }
        match &self.error {
            Some(message) => Err(ControlPlaneError::Api {
                status: 403,
                message: message.clone(),
            }),
            None => Ok(self.entries.clone()),
        }
    }
}
