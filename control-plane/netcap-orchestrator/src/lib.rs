pub mod config;
pub mod discovery;
pub mod errors;
pub mod executor;
pub mod interrupt;
pub mod lifecycle;
pub mod phases;
pub mod poller;
pub mod prober;
pub mod report;
pub mod retry;
pub mod targets;

pub use config::{Cli, RunConfig, RunMode, VerifyMode, token_source_from_env};
pub use discovery::discover;
pub use errors::*;
pub use executor::{BoundedExecutor, TaskError};
pub use interrupt::{FORCED_EXIT_CODE, escalate_interrupts, interrupt_signals};
pub use lifecycle::{
    Action, LifecycleConfig, LifecycleItem, LifecycleOrchestrator,
    SubmittedBatch, Submission,
};
pub use phases::{Runner, verify_services};
pub use poller::{CheckerRun, ExecutionPoller, PollerConfig};
pub use prober::{ProbeConfig, Prober};
pub use report::{Phase, PhaseReport, ReportItems, RunReport};
pub use retry::{RetryController, RetryOutcome, RetryPolicy, RoundRecord};
pub use targets::generate_targets;
