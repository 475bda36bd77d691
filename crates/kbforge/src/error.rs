//! CLI error types.

use kbforge_config::ConfigError;
use kbforge_core::PipelineError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("{failed} output target(s) could not be written")]
    Emit { failed: usize },
}
