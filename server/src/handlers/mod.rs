//! Request handlers: translate requests into engine operations.

mod nodes;
mod projects;
mod versions;

pub use nodes::*;
pub use projects::*;
pub use versions::*;
