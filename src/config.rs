use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

/// How the subject binary receives its input on a benchmarked run
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InvocationMode {
    /// Input file as a path argument, results printed to the console
    Console,
    /// Input file as a path argument, results written to an output directory
    OutputDir,
    /// Input file piped over standard input
    Stdin,
}

/// Time unit requested from the timing tool
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Millisecond,
}

impl TimeUnit {
    /// Value passed to the timing tool's unit flag
    pub fn flag_value(&self) -> &'static str {
        match self {
            TimeUnit::Millisecond => "millisecond",
        }
    }
}

/// The binary under measurement and the input it is fed
#[derive(Debug, Deserialize, Clone)]
pub struct SubjectConfig {
    /// Path to the release binary
    pub binary: PathBuf,
    /// Input file handed to the binary
    pub input: PathBuf,
}

/// Settings for the external timing tool
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    /// Timing tool executable
    #[serde(default = "default_tool")]
    pub tool: String,
    /// Warm-up runs performed by the timing tool itself
    #[serde(default = "default_tool_warmup")]
    pub warmup: u32,
    /// Time unit for reported results
    #[serde(default)]
    pub unit: TimeUnit,
    /// Kill any spawned process after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Extra options passed through to the timing tool
    #[serde(default)]
    pub options: HashMap<String, Value>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            warmup: default_tool_warmup(),
            unit: TimeUnit::default(),
            timeout_secs: None,
            options: HashMap::new(),
        }
    }
}

impl TimingConfig {
    /// Timeout as a Duration, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// One benchmarked invocation shape with its own history file
#[derive(Debug, Deserialize, Clone)]
pub struct VariantConfig {
    /// Variant name used in logs
    pub name: String,
    /// How the subject receives its input
    pub mode: InvocationMode,
    /// History file receiving this variant's rows
    pub history: PathBuf,
    /// Directory the subject writes into (output-dir mode only)
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
}

/// Hook configuration loaded from relbench.yml
#[derive(Debug, Deserialize, Clone)]
pub struct HookConfig {
    /// Binary under measurement
    pub subject: SubjectConfig,
    /// Timing tool settings
    #[serde(default)]
    pub timing: TimingConfig,
    /// Manifest holding the version declaration
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    /// Warm-up invocations run by the hook itself before measuring
    #[serde(default = "default_warmup_runs")]
    pub warmup_runs: u32,
    /// Benchmark variants, each measured and recorded independently
    #[serde(default = "default_variants")]
    pub variants: Vec<VariantConfig>,
    /// Formatter command; defaults to this binary's own `format` subcommand
    #[serde(default)]
    pub formatter: Option<Vec<String>>,
    /// Command printing the current commit hash as its first output line
    #[serde(default = "default_commit_command")]
    pub commit_command: Vec<String>,
    /// Path to the config file (set during loading)
    #[serde(default)]
    pub path: PathBuf,
}

fn default_tool() -> String {
    "hyperfine".to_string()
}

fn default_tool_warmup() -> u32 {
    50
}

fn default_manifest() -> PathBuf {
    PathBuf::from("Cargo.toml")
}

fn default_warmup_runs() -> u32 {
    5
}

fn default_commit_command() -> Vec<String> {
    vec![
        "git".to_string(),
        "log".to_string(),
        "--format=%H".to_string(),
        "-n".to_string(),
        "1".to_string(),
    ]
}

fn default_variants() -> Vec<VariantConfig> {
    vec![VariantConfig {
        name: "default".to_string(),
        mode: InvocationMode::Console,
        history: PathBuf::from("bench_over_time.csv"),
        out_dir: None,
    }]
}

impl HookConfig {
    /// Validate the loaded configuration
    pub fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            anyhow::bail!("At least one benchmark variant must be configured");
        }

        for variant in &self.variants {
            if variant.mode == InvocationMode::OutputDir && variant.out_dir.is_none() {
                anyhow::bail!(
                    "Variant '{}' uses output-dir mode but sets no out_dir",
                    variant.name
                );
            }
        }

        if self.commit_command.is_empty() {
            anyhow::bail!("commit_command cannot be empty");
        }

        if let Some(formatter) = &self.formatter {
            if formatter.is_empty() {
                anyhow::bail!("formatter cannot be an empty command");
            }
        }

        Ok(())
    }

    /// Resolve all configured paths relative to the config file's directory
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.subject.binary = paths::resolve_path(&self.subject.binary, config_dir);
        self.subject.input = paths::resolve_path(&self.subject.input, config_dir);
        self.manifest = paths::resolve_path(&self.manifest, config_dir);

        for variant in &mut self.variants {
            variant.history = paths::resolve_path(&variant.history, config_dir);
            if let Some(out_dir) = &variant.out_dir {
                variant.out_dir = Some(paths::resolve_path(out_dir, config_dir));
            }
        }
    }
}

/// Load the hook configuration from a YAML file
pub fn load_hook_config(config_path: &Path) -> Result<HookConfig> {
    if !config_path.exists() {
        anyhow::bail!("Config file not found: {:?}", config_path);
    }

    let config_dir = config_path
        .parent()
        .context("Failed to get config directory")?;

    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

    let mut config: HookConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse YAML from file: {:?}", config_path))?;

    config.resolve_paths(config_dir);
    config.path = config_path.to_path_buf();
    config.validate()?;

    debug!("Using configuration\n{:?}", config);
    Ok(config)
}
