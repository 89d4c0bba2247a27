use anyhow::Result;
use log::{error, info, warn};

use crate::config::HookConfig;
use crate::hook::benchmark::{
    BenchmarkRunner, BenchmarkTarget, MeasurementRequest, MeasurementResult, WarmupPolicy,
};
use crate::hook::formatter::ResultFormatter;
use crate::hook::git;
use crate::hook::history::HistoryAppender;
use crate::hook::manifest::{ManifestVersionWriter, VersionPatch};
use crate::paths;

/// Release-pipeline hook orchestrator.
///
/// One instance is constructed per release-pipeline run and carries no state
/// between the two entry points. Every failure either entry point encounters
/// is contained and logged: the release proceeds no matter what happens in
/// here, and the only symptom of a total benchmark failure is a missing
/// history row.
pub struct ReleaseHook {
    config: HookConfig,
    manifest_writer: ManifestVersionWriter,
    benchmark_runner: BenchmarkRunner,
    formatter: ResultFormatter,
}

impl ReleaseHook {
    /// Create a hook for one release-pipeline run
    pub fn new(config: HookConfig) -> Result<Self> {
        let manifest_writer = ManifestVersionWriter::new()?;
        let benchmark_runner = BenchmarkRunner::new(&config.timing);

        let formatter_command = match &config.formatter {
            Some(command) => command.clone(),
            None => ResultFormatter::default_command()?,
        };
        let formatter = ResultFormatter::new(formatter_command, config.timing.timeout());

        Ok(Self {
            config,
            manifest_writer,
            benchmark_runner,
            formatter,
        })
    }

    /// Patch the manifest ahead of the release version bump
    pub fn on_version_bump(&self, version: &str) {
        info!(
            "Setting version {version} in {}",
            self.config.manifest.display()
        );

        match self
            .manifest_writer
            .set_version(&self.config.manifest, version)
        {
            Ok(VersionPatch::Updated) => {
                info!("Manifest updated to version {version}");
            }
            Ok(VersionPatch::PatternMissing) => {
                warn!(
                    "No version declaration found in {}; manifest left unchanged",
                    self.config.manifest.display()
                );
            }
            Err(e) => error!("{e}"),
        }
    }

    /// Warm up, measure and record every configured variant ahead of the tag
    /// creation
    pub fn on_tag_create(&self, tag: &str) {
        let commit = match git::current_commit(
            &self.config.commit_command,
            self.config.timing.timeout(),
        ) {
            Ok(commit) => commit,
            Err(e) => {
                // A history row without a commit id cannot be correlated later
                error!("{e}; skipping benchmarks for tag {tag}");
                return;
            }
        };

        let policy = WarmupPolicy {
            iterations: self.config.warmup_runs,
        };

        for variant in &self.config.variants {
            info!("Benchmarking variant '{}' for tag {tag}", variant.name);

            if let Some(out_dir) = &variant.out_dir {
                if let Err(e) = paths::ensure_directory(out_dir) {
                    warn!("variant '{}': {e:#}", variant.name);
                }
            }

            let target = BenchmarkTarget::from_variant(&self.config.subject, variant);

            self.benchmark_runner.run_warmup(&target, &policy);

            let request = MeasurementRequest::new(target, &self.config.timing);
            let timing = match self.benchmark_runner.run_measured(&request) {
                Ok(timing) => timing,
                Err(e) => {
                    error!("variant '{}': {e}", variant.name);
                    continue;
                }
            };

            let result = MeasurementResult::new(timing, commit.clone(), tag.to_string());

            let row = match self.formatter.format_row(&result) {
                Ok(row) => row,
                Err(e) => {
                    error!("variant '{}': {e}", variant.name);
                    continue;
                }
            };

            match HistoryAppender::append(&variant.history, &row) {
                Ok(()) => info!(
                    "Recorded benchmark for variant '{}' in {}",
                    variant.name,
                    variant.history.display()
                ),
                Err(e) => error!("variant '{}': {e}", variant.name),
            }
        }
    }
}
