use anyhow::{Context, Result};
use regex::{NoExpand, Regex};
use std::path::Path;

use crate::hook::HookError;

const VERSION_PATTERN: &str = r#"version = "\d+\.\d+\.\d+""#;

/// Outcome of a version patch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPatch {
    Updated,
    PatternMissing,
}

/// Rewrites the version declaration inside the project manifest.
///
/// Only this writer touches the manifest; calls are serialized by the release
/// pipeline, so no locking is involved.
pub struct ManifestVersionWriter {
    pattern: Regex,
}

impl ManifestVersionWriter {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(VERSION_PATTERN).context("Failed to compile version pattern")?;
        Ok(Self { pattern })
    }

    /// Replace the first `version = "X.Y.Z"` declaration with `new_version`.
    ///
    /// A manifest without the pattern is left byte-for-byte unchanged and the
    /// omission is reported to the caller.
    pub fn set_version(
        &self,
        manifest_path: &Path,
        new_version: &str,
    ) -> Result<VersionPatch, HookError> {
        let text = std::fs::read_to_string(manifest_path)
            .with_context(|| format!("Failed to read manifest: {}", manifest_path.display()))
            .map_err(HookError::ManifestWrite)?;

        if !self.pattern.is_match(&text) {
            return Ok(VersionPatch::PatternMissing);
        }

        let replacement = format!("version = \"{new_version}\"");
        let updated = self.pattern.replace(&text, NoExpand(&replacement));

        std::fs::write(manifest_path, updated.as_bytes())
            .with_context(|| format!("Failed to write manifest: {}", manifest_path.display()))
            .map_err(HookError::ManifestWrite)?;

        Ok(VersionPatch::Updated)
    }
}
