//! `agentmint-worker` -- operator binary for batch image generation.
//!
//! Loads the prompt collection, resolves the requested scope, and runs
//! it through the generation pipeline against the fal.ai queue.

pub mod cli;
pub mod config;
pub mod summary;
