pub mod outcome;
pub mod probe;
pub mod resource;
pub mod spec;
pub mod summary;
pub mod target;

pub use outcome::*;
pub use probe::*;
pub use resource::*;
pub use spec::*;
pub use summary::*;
pub use target::*;
