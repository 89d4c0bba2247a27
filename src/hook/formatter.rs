use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::time::Duration;

use crate::command::CommandExecutor;
use crate::hook::benchmark::MeasurementResult;
use crate::hook::HookError;

/// Runs the formatter process over a measurement.
///
/// The formatter is an opaque stdin-to-stdout transformation: it receives the
/// timing tool's output followed by a commit line and a tag line, and emits
/// one history row. By default it is this binary's own `format` subcommand,
/// but any command can be configured in its place.
pub struct ResultFormatter {
    command: Vec<String>,
    timeout: Option<Duration>,
}

impl ResultFormatter {
    pub fn new(command: Vec<String>, timeout: Option<Duration>) -> Self {
        Self { command, timeout }
    }

    /// The default formatter command: this binary's `format` subcommand
    pub fn default_command() -> Result<Vec<String>> {
        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        Ok(vec![exe.display().to_string(), "format".to_string()])
    }

    /// Pipe the measurement plus commit and tag lines through the formatter
    /// and capture the row it produces
    pub fn format_row(&self, result: &MeasurementResult) -> Result<String, HookError> {
        let mut input = result.raw_stdout.clone();
        if !input.ends_with('\n') {
            input.push('\n');
        }
        input.push_str(&result.commit_hash);
        input.push('\n');
        input.push_str(&result.release_tag);
        input.push('\n');

        let executor = CommandExecutor::builder()
            .capture_output(true)
            .name(self.command.join(" "))
            .timeout(self.timeout)
            .build();

        let args: Vec<&str> = self.command[1..].iter().map(String::as_str).collect();
        let output = executor
            .execute_with_input(&self.command[0], &args, input.as_bytes())
            .map_err(HookError::Formatting)?;

        let row = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if row.is_empty() {
            return Err(HookError::Formatting(anyhow!(
                "formatter produced no output"
            )));
        }

        Ok(row)
    }
}

/// Turn a timing summary plus trailing commit and tag lines into one CSV row.
///
/// Column order: mean, then min, max and run count when the summary carries a
/// `Range` line, then commit, then tag.
pub fn format_summary(input: &str) -> Result<String> {
    let float = Regex::new(r"\d+\.\d+").context("Failed to compile duration pattern")?;
    let runs = Regex::new(r"(\d+) runs").context("Failed to compile run count pattern")?;

    let lines: Vec<&str> = input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < 3 {
        anyhow::bail!("expected a timing summary followed by commit and tag lines");
    }

    // The hook always pipes the commit and the tag last
    let tag = lines[lines.len() - 1];
    let commit = lines[lines.len() - 2];

    let mut columns: Vec<String> = Vec::new();

    let mean_line = lines
        .iter()
        .find(|line| line.starts_with("Time"))
        .context("no Time line in timing summary")?;
    let mean = float
        .find(mean_line)
        .context("no duration in Time line")?;
    columns.push(mean.as_str().to_string());

    if let Some(range_line) = lines.iter().find(|line| line.starts_with("Range")) {
        for duration in float.find_iter(range_line) {
            columns.push(duration.as_str().to_string());
        }
        if let Some(count) = runs.captures(range_line) {
            columns.push(count[1].to_string());
        }
    }

    columns.push(commit.to_string());
    columns.push(tag.to_string());

    Ok(columns.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::benchmark::TimingOutput;

    const COMMIT: &str = "abc1234567890abcdef1234567890abcdef12345";

    #[test]
    fn test_format_summary_full() {
        let input = format!(
            "Benchmark 1: target/release/subject spec.json --output-to console\n\
             \x20 Time (mean \u{b1} \u{3c3}):       7.7 ms \u{b1}   0.2 ms    [User: 6.6 ms, System: 0.6 ms]\n\
             \x20 Range (min \u{2026} max):     7.1 ms \u{2026}  30.4 ms    297 runs\n\
             \n\
             {COMMIT}\n\
             v1.2.0\n"
        );

        let row = format_summary(&input).unwrap();
        assert_eq!(row, format!("7.7,7.1,30.4,297,{COMMIT},v1.2.0"));
    }

    #[test]
    fn test_format_summary_without_range_line() {
        let input = format!("Time (mean): 12.3 ms\n{COMMIT}\nv1.2.0\n");

        let row = format_summary(&input).unwrap();
        assert_eq!(row, format!("12.3,{COMMIT},v1.2.0"));
    }

    #[test]
    fn test_format_summary_rejects_short_input() {
        assert!(format_summary("Time (mean): 12.3 ms\nv1.2.0\n").is_err());
        assert!(format_summary("").is_err());
    }

    #[test]
    fn test_format_summary_rejects_missing_time_line() {
        let input = format!("something else entirely\n{COMMIT}\nv1.2.0\n");
        assert!(format_summary(&input).is_err());
    }

    #[test]
    fn test_format_row_through_external_command() {
        // `cat` echoes the piped input back, proving the wiring
        let formatter = ResultFormatter::new(vec!["cat".to_string()], None);
        let result = MeasurementResult::new(
            TimingOutput {
                stdout: "Time (mean): 12.3 ms".to_string(),
                stderr: String::new(),
            },
            COMMIT.to_string(),
            "v1.2.0".to_string(),
        );

        let row = formatter.format_row(&result).unwrap();
        assert!(row.contains("Time (mean): 12.3 ms"));
        assert!(row.contains(COMMIT));
        assert!(row.ends_with("v1.2.0"));
    }

    #[test]
    fn test_format_row_empty_output_is_an_error() {
        let formatter = ResultFormatter::new(vec!["true".to_string()], None);
        let result = MeasurementResult::new(
            TimingOutput {
                stdout: "Time (mean): 12.3 ms".to_string(),
                stderr: String::new(),
            },
            COMMIT.to_string(),
            "v1.2.0".to_string(),
        );

        let row = formatter.format_row(&result);
        assert!(matches!(row, Err(HookError::Formatting(_))));
    }

    #[test]
    fn test_format_row_failed_command_is_an_error() {
        let formatter = ResultFormatter::new(vec!["false".to_string()], None);
        let result = MeasurementResult::new(
            TimingOutput {
                stdout: "Time (mean): 12.3 ms".to_string(),
                stderr: String::new(),
            },
            COMMIT.to_string(),
            "v1.2.0".to_string(),
        );

        let row = formatter.format_row(&result);
        assert!(matches!(row, Err(HookError::Formatting(_))));
    }
}
