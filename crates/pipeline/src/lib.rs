//! Batch execution engine.
//!
//! Drives work items through the remote generator one at a time:
//! rate-limited, retried with backoff, committed atomically to the
//! completion store, and summarised in a [`RunReport`](report::RunReport).

pub mod error;
pub mod rate_limit;
pub mod report;
pub mod retry;
pub mod runner;
pub mod store;
