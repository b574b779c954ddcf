//! Shell command steps.
//!
//! [`CommandStep`] is the collaborator the CLI registers for every configured
//! step: it runs a shell command, captures its output, and kills the child
//! process when the attempt is cancelled.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::unit::{StepContext, StepError, StepOutput, StepUnit};

/// Maximum number of stderr characters kept in a failure message.
const STDERR_TAIL: usize = 2000;

/// A step that runs a shell command.
#[derive(Debug, Clone)]
pub struct CommandStep {
    command: String,
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl CommandStep {
    /// Create a step running `command` through the platform shell.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: None,
            env: HashMap::new(),
        }
    }

    /// Set the working directory.
    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add environment variables.
    pub fn envs(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// The command line.
    pub fn command(&self) -> &str {
        &self.command
    }

    fn build(&self, ctx: &StepContext) -> Command {
        let mut cmd = shell_command(&self.command);

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.envs(&self.env)
            .env("PIPEWAVE_RUN_ID", ctx.run().run_id().to_string())
            .env("PIPEWAVE_STEP", ctx.step_id())
            .env("PIPEWAVE_ATTEMPT", ctx.attempt().to_string())
            .env(
                "PIPEWAVE_CONTINUE_ON_ITEM_ERROR",
                ctx.run().continue_on_item_error().to_string(),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd
    }
}

#[async_trait]
impl StepUnit for CommandStep {
    async fn run(&self, ctx: StepContext) -> Result<StepOutput, StepError> {
        debug!(step = ctx.step_id(), command = %self.command, "spawning command");

        let child = self.build(&ctx).spawn().map_err(|e| {
            StepError::failed(format!("failed to spawn `{}`: {}", self.command, e))
        })?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = ctx.cancelled() => return Err(StepError::Cancelled),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            let mut message = format!("`{}` exited with {}", self.command, code);
            if !stderr.is_empty() {
                message.push_str(": ");
                message.push_str(tail(&stderr, STDERR_TAIL));
            }
            return Err(StepError::failed(message));
        }

        let mut out = StepOutput::new(parse_stdout(&stdout));
        if !stderr.is_empty() {
            out = out.with_warning(tail(&stderr, STDERR_TAIL).to_string());
        }
        Ok(out)
    }
}

/// Structured output if the command printed JSON, else the raw text.
fn parse_stdout(stdout: &str) -> serde_json::Value {
    if stdout.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(stdout).unwrap_or_else(|_| serde_json::Value::String(stdout.to_string()))
}

fn tail(s: &str, max_chars: usize) -> &str {
    let count = s.chars().count();
    if count <= max_chars {
        return s;
    }
    let start = s
        .char_indices()
        .nth(count - max_chars)
        .map_or(0, |(i, _)| i);
    &s[start..]
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let shell = std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string());
    let mut cmd = Command::new(shell);
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::runner::RunContext;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;

    fn context(step: &str, cancel: CancellationToken) -> StepContext {
        StepContext::new(
            step,
            1,
            cancel,
            Arc::new(RunContext::new(true)),
            Arc::new(BTreeMap::new()),
        )
    }

    #[tokio::test]
    async fn successful_command_captures_stdout() {
        let step = CommandStep::new("echo hello");
        let out = step
            .run(context("greet", CancellationToken::new()))
            .await
            .unwrap();
        assert_eq!(out.data, serde_json::json!("hello"));
    }

    #[tokio::test]
    async fn json_stdout_becomes_structured_data() {
        let step = CommandStep::new(r#"echo '{"rows": 12}'"#);
        let out = step
            .run(context("extract", CancellationToken::new()))
            .await
            .unwrap();
        assert_eq!(out.data["rows"], 12);
    }

    #[tokio::test]
    async fn failing_command_reports_exit_code_and_stderr() {
        let step = CommandStep::new("echo broken >&2; exit 3");
        let err = step
            .run(context("bad", CancellationToken::new()))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exited with 3"));
        assert!(msg.contains("broken"));
    }

    #[tokio::test]
    async fn step_environment_is_exported() {
        let mut env = HashMap::new();
        env.insert("REPORT_NAME".to_string(), "summary".to_string());
        let step = CommandStep::new("echo $PIPEWAVE_STEP-$PIPEWAVE_ATTEMPT-$REPORT_NAME").envs(env);
        let out = step
            .run(context("validation_reports", CancellationToken::new()))
            .await
            .unwrap();
        assert_eq!(out.data, serde_json::json!("validation_reports-1-summary"));
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "").unwrap();
        let step = CommandStep::new("ls").current_dir(temp.path());
        let out = step
            .run(context("ls", CancellationToken::new()))
            .await
            .unwrap();
        assert!(out.data.as_str().unwrap().contains("marker.txt"));
    }

    #[tokio::test]
    async fn cancellation_stops_long_command() {
        let cancel = CancellationToken::new();
        let step = CommandStep::new("sleep 30");
        let ctx = context("slow", cancel.clone());

        let start = Instant::now();
        let handle = tokio::spawn(async move { step.run(ctx).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let result = handle.await.unwrap();
        assert_eq!(result.unwrap_err(), StepError::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn tail_keeps_last_characters() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("abc", 10), "abc");
    }
}
