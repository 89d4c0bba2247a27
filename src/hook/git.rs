use anyhow::anyhow;
use log::debug;
use std::time::Duration;

use crate::command::CommandExecutor;
use crate::hook::HookError;

/// Run the configured commit-query command and return the first line of its
/// output, which is expected to be the current commit's full hash
pub fn current_commit(command: &[String], timeout: Option<Duration>) -> Result<String, HookError> {
    let (cmd, args) = command
        .split_first()
        .ok_or_else(|| HookError::CommitQuery(anyhow!("empty commit command")))?;
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let executor = CommandExecutor::builder()
        .capture_output(true)
        .timeout(timeout)
        .build();

    let output = executor
        .execute_command_with_args(cmd, &args)
        .map_err(HookError::CommitQuery)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let commit = stdout.lines().next().unwrap_or("").trim().to_string();

    if commit.is_empty() {
        return Err(HookError::CommitQuery(anyhow!(
            "commit query produced no output"
        )));
    }

    debug!("Current commit: {commit}");
    Ok(commit)
}
