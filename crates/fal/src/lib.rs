//! fal.ai queue client library.
//!
//! Provides typed queue messages, REST wrappers for the submit / poll /
//! fetch / download cycle, a failure taxonomy the retry layer can act
//! on, and the [`GenerationClient`](client::GenerationClient) seam the
//! batch pipeline drives.

pub mod api;
pub mod client;
pub mod error;
pub mod messages;
pub mod payload;
