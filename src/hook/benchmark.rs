use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::CommandExecutor;
use crate::config::{InvocationMode, SubjectConfig, TimeUnit, TimingConfig, VariantConfig};
use crate::hook::HookError;

/// A single invocation shape of the subject binary
#[derive(Debug, Clone)]
pub struct BenchmarkTarget {
    /// Subject binary
    pub binary: PathBuf,
    /// Input file
    pub input: PathBuf,
    /// How the input reaches the binary
    pub mode: InvocationMode,
    /// Directory the subject writes into (output-dir mode only)
    pub out_dir: Option<PathBuf>,
}

impl BenchmarkTarget {
    /// Build the target for one configured variant
    pub fn from_variant(subject: &SubjectConfig, variant: &VariantConfig) -> Self {
        Self {
            binary: subject.binary.clone(),
            input: subject.input.clone(),
            mode: variant.mode,
            out_dir: variant.out_dir.clone(),
        }
    }

    /// Arguments passed to the subject binary
    pub fn subject_args(&self) -> Vec<String> {
        match self.mode {
            InvocationMode::Console => vec![
                self.input.display().to_string(),
                "--output-to".to_string(),
                "console".to_string(),
            ],
            InvocationMode::OutputDir => {
                let out_dir = self.out_dir.as_deref().unwrap_or(Path::new("."));
                vec![
                    self.input.display().to_string(),
                    "-o".to_string(),
                    out_dir.display().to_string(),
                ]
            }
            // Input arrives on stdin, so no path argument
            InvocationMode::Stdin => vec!["--output-to".to_string(), "console".to_string()],
        }
    }

    /// Stdin source for the subject, if the mode pipes the input
    pub fn stdin_file(&self) -> Option<&Path> {
        match self.mode {
            InvocationMode::Stdin => Some(&self.input),
            _ => None,
        }
    }

    /// The full subject command line, handed to the timing tool as one argument
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.binary.display().to_string()];
        parts.extend(self.subject_args());
        parts.join(" ")
    }
}

/// Number of best-effort priming runs before the measured run
#[derive(Debug, Clone, Copy)]
pub struct WarmupPolicy {
    pub iterations: u32,
}

/// One timed invocation of the timing tool against a target
#[derive(Debug, Clone)]
pub struct MeasurementRequest {
    pub target: BenchmarkTarget,
    pub unit: TimeUnit,
    /// Warm-up runs performed by the timing tool itself
    pub warmup: u32,
    /// The timing tool must not interpose a shell
    pub shellless: bool,
    /// Extra options passed through to the timing tool
    pub options: HashMap<String, Value>,
}

impl MeasurementRequest {
    pub fn new(target: BenchmarkTarget, timing: &TimingConfig) -> Self {
        Self {
            target,
            unit: timing.unit,
            warmup: timing.warmup,
            shellless: true,
            options: timing.options.clone(),
        }
    }
}

/// Raw captured output of one timing tool run
#[derive(Debug, Clone)]
pub struct TimingOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Captured output of one measured run, tagged for the history log
#[derive(Debug, Clone)]
pub struct MeasurementResult {
    pub raw_stdout: String,
    pub raw_stderr: String,
    pub commit_hash: String,
    pub release_tag: String,
}

impl MeasurementResult {
    pub fn new(timing: TimingOutput, commit_hash: String, release_tag: String) -> Self {
        Self {
            raw_stdout: timing.stdout,
            raw_stderr: timing.stderr,
            commit_hash,
            release_tag,
        }
    }
}

/// Drives warm-up runs of the subject binary and the single measured run
/// through the external timing tool
pub struct BenchmarkRunner {
    tool: String,
    timeout: Option<Duration>,
}

impl BenchmarkRunner {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            tool: timing.tool.clone(),
            timeout: timing.timeout(),
        }
    }

    /// Run the subject `policy.iterations` times sequentially, discarding output.
    ///
    /// Failed runs are logged and skipped; warm-up never fails the release.
    pub fn run_warmup(&self, target: &BenchmarkTarget, policy: &WarmupPolicy) {
        if policy.iterations == 0 {
            return;
        }

        let pb = ProgressBar::new(policy.iterations as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("warm-up [{bar:40}] {pos}/{len}")
                .unwrap(),
        );

        let executor = CommandExecutor::builder()
            .name(format!("warm-up: {}", target.command_line()))
            .timeout(self.timeout)
            .build();

        let binary = target.binary.display().to_string();
        let args = target.subject_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        for i in 0..policy.iterations {
            let run = match target.stdin_file() {
                Some(input) => executor.execute_with_stdin_file(&binary, &args, input),
                None => executor.execute_command_with_args(&binary, &args),
            };

            if let Err(e) = run {
                let err = HookError::Warmup(e);
                warn!("{err} (iteration {}/{})", i + 1, policy.iterations);
            }

            pb.inc(1);
        }

        pb.finish_and_clear();
    }

    /// Invoke the timing tool exactly once and capture its summary
    pub fn run_measured(&self, request: &MeasurementRequest) -> Result<TimingOutput, HookError> {
        let args = self.timing_args(request);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let executor = CommandExecutor::builder()
            .capture_output(true)
            .timeout(self.timeout)
            .build();

        let output = executor
            .execute_command_with_args(&self.tool, &args)
            .map_err(HookError::Measurement)?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        debug!("timing tool stdout:\n{stdout}");
        if !stderr.is_empty() {
            debug!("timing tool stderr:\n{stderr}");
        }

        Ok(TimingOutput { stdout, stderr })
    }

    /// Build the timing tool's argument list
    fn timing_args(&self, request: &MeasurementRequest) -> Vec<String> {
        let mut args = vec![
            "--warmup".to_string(),
            request.warmup.to_string(),
            "-u".to_string(),
            request.unit.flag_value().to_string(),
        ];

        if request.shellless {
            args.push("--shell=none".to_string());
        }

        if let Some(input) = request.target.stdin_file() {
            args.push("--input".to_string());
            args.push(input.display().to_string());
        }

        // Extra options sorted for a stable command line
        let mut extra: Vec<_> = request.options.iter().collect();
        extra.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (key, value) in extra {
            match value {
                Value::Bool(true) => args.push(format!("--{key}")),
                Value::Bool(false) => {}
                Value::String(s) => {
                    args.push(format!("--{key}"));
                    args.push(s.clone());
                }
                other => {
                    args.push(format!("--{key}"));
                    args.push(other.to_string());
                }
            }
        }

        args.push(request.target.command_line());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console_target() -> BenchmarkTarget {
        BenchmarkTarget {
            binary: PathBuf::from("/opt/subject"),
            input: PathBuf::from("/opt/spec.json"),
            mode: InvocationMode::Console,
            out_dir: None,
        }
    }

    #[test]
    fn test_subject_args_console() {
        let target = console_target();
        assert_eq!(
            target.subject_args(),
            vec!["/opt/spec.json", "--output-to", "console"]
        );
        assert!(target.stdin_file().is_none());
        assert_eq!(
            target.command_line(),
            "/opt/subject /opt/spec.json --output-to console"
        );
    }

    #[test]
    fn test_subject_args_output_dir() {
        let target = BenchmarkTarget {
            out_dir: Some(PathBuf::from("/tmp/out")),
            mode: InvocationMode::OutputDir,
            ..console_target()
        };
        assert_eq!(
            target.subject_args(),
            vec!["/opt/spec.json", "-o", "/tmp/out"]
        );
        assert!(target.stdin_file().is_none());
    }

    #[test]
    fn test_subject_args_stdin() {
        let target = BenchmarkTarget {
            mode: InvocationMode::Stdin,
            ..console_target()
        };
        assert_eq!(target.subject_args(), vec!["--output-to", "console"]);
        assert_eq!(target.stdin_file(), Some(Path::new("/opt/spec.json")));
    }

    #[test]
    fn test_timing_args() {
        let runner = BenchmarkRunner::new(&TimingConfig::default());
        let mut request = MeasurementRequest::new(console_target(), &TimingConfig::default());
        request.warmup = 10;
        request.options.insert("min-runs".to_string(), Value::from(20));
        request.options.insert("show-output".to_string(), Value::from(true));

        let args = runner.timing_args(&request);
        assert_eq!(
            args,
            vec![
                "--warmup",
                "10",
                "-u",
                "millisecond",
                "--shell=none",
                "--min-runs",
                "20",
                "--show-output",
                "/opt/subject /opt/spec.json --output-to console",
            ]
        );
    }

    #[test]
    fn test_timing_args_stdin_variant() {
        let runner = BenchmarkRunner::new(&TimingConfig::default());
        let target = BenchmarkTarget {
            mode: InvocationMode::Stdin,
            ..console_target()
        };
        let request = MeasurementRequest::new(target, &TimingConfig::default());

        let args = runner.timing_args(&request);
        assert!(args.contains(&"--input".to_string()));
        assert!(args.contains(&"/opt/spec.json".to_string()));
        assert_eq!(
            args.last().unwrap(),
            "/opt/subject --output-to console"
        );
    }

    #[test]
    fn test_warmup_never_fails() {
        let runner = BenchmarkRunner::new(&TimingConfig::default());
        let target = BenchmarkTarget {
            binary: PathBuf::from("/nonexistent/binary"),
            ..console_target()
        };

        // Every iteration fails to spawn; run_warmup still returns normally
        runner.run_warmup(&target, &WarmupPolicy { iterations: 3 });
    }

    #[test]
    fn test_warmup_zero_iterations() {
        let runner = BenchmarkRunner::new(&TimingConfig::default());
        runner.run_warmup(&console_target(), &WarmupPolicy { iterations: 0 });
    }

    #[test]
    fn test_run_measured_missing_tool() {
        let timing = TimingConfig {
            tool: "/nonexistent/hyperfine".to_string(),
            ..TimingConfig::default()
        };
        let runner = BenchmarkRunner::new(&timing);
        let request = MeasurementRequest::new(console_target(), &timing);

        let result = runner.run_measured(&request);
        assert!(matches!(result, Err(HookError::Measurement(_))));
    }

    #[test]
    fn test_run_measured_captures_output() {
        // `echo` stands in for the timing tool and parrots its arguments back
        let timing = TimingConfig {
            tool: "echo".to_string(),
            ..TimingConfig::default()
        };
        let runner = BenchmarkRunner::new(&timing);
        let request = MeasurementRequest::new(console_target(), &timing);

        let output = runner.run_measured(&request).unwrap();
        assert!(output.stdout.contains("--shell=none"));
        assert!(output.stdout.contains("/opt/subject"));
        assert!(output.stderr.is_empty());
    }
}
