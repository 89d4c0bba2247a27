use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

const TIMEOUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Command execution context
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Name of the command for logging
    pub command_name: Option<String>,
    /// Current working directory
    pub working_dir: Option<String>,
    /// Environment variables to set
    pub env_vars: HashMap<String, String>,
    /// Capture output
    pub capture_output: bool,
    /// Allow command to fail without returning an error
    pub allow_failure: bool,
    /// Kill the command if it runs longer than this
    pub timeout: Option<Duration>,
}

/// Builder for CommandExecutor
pub struct CommandExecutorBuilder {
    context: CommandContext,
}

impl Default for CommandExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutorBuilder {
    /// Create a new CommandExecutorBuilder with default settings
    pub fn new() -> Self {
        Self {
            context: CommandContext::default(),
        }
    }

    /// Set whether to capture command output
    pub fn capture_output(mut self, capture: bool) -> Self {
        self.context.capture_output = capture;
        self
    }

    /// Set the working directory
    pub fn working_dir<P: AsRef<Path>>(mut self, dir: Option<P>) -> Self {
        self.context.working_dir = dir.map(|d| d.as_ref().to_string_lossy().to_string());
        self
    }

    /// Add environment variables
    pub fn env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.context.env_vars.extend(vars);
        self
    }

    /// Add a single environment variable
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.env_vars.insert(key.into(), value.into());
        self
    }

    /// Set whether to allow command failures without returning an error
    pub fn allow_failure(mut self, allow: bool) -> Self {
        self.context.allow_failure = allow;
        self
    }

    /// Set a deadline after which the command is killed
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.context.timeout = timeout;
        self
    }

    /// Set a name for the command for logging purposes
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.context.command_name = Some(name.into());
        self
    }

    /// Build the CommandExecutor
    pub fn build(self) -> CommandExecutor {
        CommandExecutor {
            context: self.context,
        }
    }
}

/// A unified interface for executing commands.
///
/// Commands are always spawned from an explicit argument list; no shell ever
/// sits between the executor and the child process.
pub struct CommandExecutor {
    context: CommandContext,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    /// Create a new CommandExecutor with default settings
    pub fn new() -> Self {
        Self {
            context: CommandContext::default(),
        }
    }

    /// Create a builder for CommandExecutor with fluent configuration
    pub fn builder() -> CommandExecutorBuilder {
        CommandExecutorBuilder::new()
    }

    /// Execute a command with arguments and wait for it to complete, returning the output
    pub fn execute_command_with_args(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let child = self.launch_command(cmd, args, Stdio::null())?;
        self.finish_command(child, cmd, args)
    }

    /// Execute a command with the given file connected to its standard input
    pub fn execute_with_stdin_file(&self, cmd: &str, args: &[&str], file: &Path) -> Result<Output> {
        let stdin = File::open(file)
            .with_context(|| format!("Failed to open stdin file: {}", file.display()))?;
        let child = self.launch_command(cmd, args, Stdio::from(stdin))?;
        self.finish_command(child, cmd, args)
    }

    /// Execute a command, writing `input` to its standard input before waiting
    pub fn execute_with_input(&self, cmd: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        let mut child = self.launch_command(cmd, args, Stdio::piped())?;

        let mut stdin = child.stdin.take().with_context(|| {
            format!("Failed to open stdin of: {}", self.format_command(cmd, args))
        })?;
        stdin.write_all(input).with_context(|| {
            format!(
                "Failed to write to stdin of: {}",
                self.format_command(cmd, args)
            )
        })?;
        drop(stdin);

        self.finish_command(child, cmd, args)
    }

    /// Launch a command, returning the child process handle
    fn launch_command(&self, cmd: &str, args: &[&str], stdin: Stdio) -> Result<Child> {
        let command_str = self.format_command(cmd, args);
        debug!("Launching command: {}", command_str);

        let mut command = Command::new(cmd);
        command.args(args);
        command.stdin(stdin);

        // Set working directory if specified
        if let Some(dir) = &self.context.working_dir {
            command.current_dir(dir);
        }

        // Add environment variables
        for (key, value) in &self.context.env_vars {
            command.env(key, value);
        }

        // Configure output capturing
        if self.context.capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let child = command
            .spawn()
            .with_context(|| format!("Failed to spawn command: {}", command_str))?;

        Ok(child)
    }

    /// Wait for a launched command, enforcing the configured timeout
    fn finish_command(&self, mut child: Child, cmd: &str, args: &[&str]) -> Result<Output> {
        if let Some(timeout) = self.context.timeout {
            // Captured output must fit the pipe buffer until the child exits;
            // a child blocked on a full pipe is killed at the deadline.
            let start = Instant::now();
            loop {
                let status = child.try_wait().with_context(|| {
                    format!(
                        "Failed to poll command status: {}",
                        self.format_command(cmd, args)
                    )
                })?;

                if status.is_some() {
                    break;
                }

                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(anyhow::anyhow!(
                        "Command timed out after {:.1}s: {}",
                        timeout.as_secs_f64(),
                        self.format_command(cmd, args)
                    ));
                }

                std::thread::sleep(TIMEOUT_POLL_INTERVAL);
            }
        }

        let output = child.wait_with_output().with_context(|| {
            format!(
                "Failed to wait for command completion: {}",
                self.format_command(cmd, args)
            )
        })?;

        if !output.status.success() && !self.context.allow_failure {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "Command failed with status {}: {}\nStderr: {}",
                output.status.code().unwrap_or(-1),
                self.format_command(cmd, args),
                stderr
            ));
        }

        Ok(output)
    }

    /// Format command and arguments for logging
    fn format_command(&self, cmd: &str, args: &[&str]) -> String {
        if let Some(name) = &self.context.command_name {
            return name.clone();
        }

        format!("{} {}", cmd, args.join(" "))
    }
}
