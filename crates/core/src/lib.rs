//! Domain types for the agentmint image batch engine.
//!
//! Everything here is pure: token ids, the prompt table, run scopes and
//! the work-item source. No network or filesystem access lives in this
//! crate.

pub mod error;
pub mod hashing;
pub mod naming;
pub mod prompts;
pub mod types;
pub mod work_item;
