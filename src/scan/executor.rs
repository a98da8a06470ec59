use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::config::ScannerConfig;
use crate::errors::HookscanError;

use super::ScanRunner;

/// Exit statuses the tool uses for a completed analysis: 0 is clean, 1 means
/// findings were reported. Anything else is a tool failure.
const ACCEPTED_EXIT_CODES: [i32; 2] = [0, 1];

/// Raw captured output of one scanner invocation.
#[derive(Debug, Clone)]
pub struct RawScanOutput {
    pub stdout: String,
    pub exit_code: i32,
}

/// Supervises Semgrep subprocesses: explicit argv, injected working
/// directory, minimal environment, bounded wall-clock time.
pub struct SemgrepRunner {
    bin: String,
    rules: String,
    kill_grace: Duration,
}

impl SemgrepRunner {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            bin: config.bin.clone(),
            rules: config.rules.clone(),
            kill_grace: Duration::from_secs(config.kill_grace_secs),
        }
    }

    fn command(&self, source_root: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["scan", "--json", "--quiet", "--config", &self.rules, "."])
            .current_dir(source_root)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The tool needs PATH to find its interpreter and HOME for its rule
        // cache; nothing else from our environment leaks in.
        for var in ["PATH", "HOME"] {
            if let Ok(value) = std::env::var(var) {
                cmd.env(var, value);
            }
        }
        cmd
    }
}

#[async_trait]
impl ScanRunner for SemgrepRunner {
    async fn run(
        &self,
        source_root: &Path,
        timeout: Duration,
    ) -> Result<RawScanOutput, HookscanError> {
        debug!(
            bin = %self.bin,
            source_root = %source_root.display(),
            timeout_secs = timeout.as_secs(),
            "Starting scanner"
        );
        let output = run_with_deadline(self.command(source_root), timeout, self.kill_grace).await?;

        if !ACCEPTED_EXIT_CODES.contains(&output.exit_code) {
            return Err(HookscanError::ScanExecution(format!(
                "scanner exited with status {}: {}",
                output.exit_code,
                truncate_diagnostics(&output.stderr)
            )));
        }

        info!(exit_code = output.exit_code, "Scanner finished");
        Ok(RawScanOutput {
            stdout: output.stdout,
            exit_code: output.exit_code,
        })
    }
}

#[derive(Debug)]
struct SupervisedOutput {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

/// Run a prepared command, forcibly terminating it if it outlives `timeout`.
/// After the kill signal the child gets `grace` to be reaped before a second
/// hard kill; `kill_on_drop` backstops the handle on every other exit path.
async fn run_with_deadline(
    mut command: Command,
    timeout: Duration,
    grace: Duration,
) -> Result<SupervisedOutput, HookscanError> {
    let mut child = command
        .spawn()
        .map_err(|e| HookscanError::ScanExecution(format!("failed to spawn scanner: {}", e)))?;

    let stdout_task = drain_stdout(&mut child);
    let stderr_task = drain_stderr(&mut child);

    let status = tokio::select! {
        status = child.wait() => status?,
        _ = tokio::time::sleep(timeout) => {
            warn!(timeout_secs = timeout.as_secs(), "Scanner exceeded deadline, killing");
            child.start_kill().ok();
            if tokio::time::timeout(grace, child.wait()).await.is_err() {
                child.kill().await.ok();
            }
            return Err(HookscanError::ScanTimeout(format!(
                "scanner killed after {}s",
                timeout.as_secs()
            )));
        }
    };

    let stdout = stdout_task
        .await
        .map_err(|e| HookscanError::Internal(format!("stdout reader panicked: {}", e)))?;
    let stderr = stderr_task
        .await
        .map_err(|e| HookscanError::Internal(format!("stderr reader panicked: {}", e)))?;

    Ok(SupervisedOutput {
        stdout,
        stderr,
        exit_code: status.code().unwrap_or(-1),
    })
}

fn drain_stdout(child: &mut Child) -> tokio::task::JoinHandle<String> {
    let pipe: Option<ChildStdout> = child.stdout.take();
    tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_string(&mut buf).await.ok();
        }
        buf
    })
}

fn drain_stderr(child: &mut Child) -> tokio::task::JoinHandle<String> {
    let pipe: Option<ChildStderr> = child.stderr.take();
    tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_string(&mut buf).await.ok();
        }
        buf
    })
}

fn truncate_diagnostics(stderr: &str) -> &str {
    let mut end = stderr.len().min(2000);
    while !stderr.is_char_boundary(end) {
        end -= 1;
    }
    &stderr[..end]
}
