//! Control-plane capability consumed by the lifecycle engine, with a REST
//! implementation and an in-memory fake.

pub mod error;
pub mod memory;
pub mod rest;
pub mod traits;
pub mod types;

pub use error::*;
pub use memory::{Call, Fault, InMemoryControlPlane, InMemoryLogReader};
pub use rest::{
    DEFAULT_LOGGING_ENDPOINT, DEFAULT_RUN_ENDPOINT, METADATA_TOKEN_URL,
    RestConfig, RestControlPlane, RestLogReader, TokenSource,
};
pub use traits::*;
pub use types::*;
