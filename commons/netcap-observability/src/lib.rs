pub mod event_format;
pub mod tracing;

pub use event_format::*;
pub use tracing::*;
