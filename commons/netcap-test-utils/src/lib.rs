//! Shared helpers for netcap test suites.

pub mod env;
pub mod fixtures;
pub mod ping;

pub use env::*;
pub use fixtures::*;
pub use ping::*;
