mod benchmark;
pub use benchmark::{
    BenchmarkRunner, BenchmarkTarget, MeasurementRequest, MeasurementResult, TimingOutput,
    WarmupPolicy,
};
mod error;
pub use error::HookError;
mod formatter;
pub use formatter::{format_summary, ResultFormatter};
pub mod git;
mod history;
pub use history::HistoryAppender;
mod manifest;
pub use manifest::{ManifestVersionWriter, VersionPatch};
mod runner;
pub use runner::ReleaseHook;
