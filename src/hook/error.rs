use std::path::PathBuf;
use thiserror::Error;

/// Failures the release hook can encounter.
///
/// Every variant is caught at the stage that produced it and logged; none of
/// them abort the release pipeline.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("warm-up run failed: {0:#}")]
    Warmup(anyhow::Error),

    #[error("measurement failed: {0:#}")]
    Measurement(anyhow::Error),

    #[error("commit query failed: {0:#}")]
    CommitQuery(anyhow::Error),

    #[error("result formatting failed: {0:#}")]
    Formatting(anyhow::Error),

    #[error("history append to {path:?} failed: {source:#}")]
    Append { path: PathBuf, source: anyhow::Error },

    #[error("manifest update failed: {0:#}")]
    ManifestWrite(anyhow::Error),
}
