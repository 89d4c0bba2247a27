use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// Expand environment variables in a path string
pub fn expand_path_str(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| path.into())
        .into_owned()
}

/// Expand a PathBuf with environment variables
pub fn expand_path_buf(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(expand_path_str(&path_str))
}

/// Create a directory and all parent directories if they don't exist
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {path:?}"))?;
        debug!("Created directory: {path:?}");
    }
    Ok(())
}

/// Expand a path and resolve it relative to a base directory.
///
/// Unlike canonicalization this works for paths that don't exist yet, which
/// is the normal case for history files before the first append.
pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    let expanded = expand_path_buf(path);

    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}
