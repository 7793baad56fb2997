use std::path::PathBuf;

use agentmint_core::error::CoreError;

/// Errors that reject a whole run before any item is attempted.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The requested scope failed validation.
    #[error(transparent)]
    Scope(#[from] CoreError),

    /// The output directory could not be created or read.
    #[error("Output directory {path} unavailable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
