//! Database module for PostgreSQL persistence.
//!
//! PostgreSQL holds an append-only journal of applied change sets plus
//! periodic snapshots of the whole store. The in-memory store is rebuilt from
//! the latest snapshot and the change sets journaled after it.

mod change_sets;
mod pool;
mod snapshots;

pub use change_sets::*;
pub use pool::*;
pub use snapshots::*;
