//! External process execution
//!
//! Every tool ferry drives (aws, oras, notation) runs through [`ToolRunner`]
//! so that HOME and the working directory point at the writable work home,
//! and so the raw result is captured for logging. Each result is also emitted
//! as a `ToolInvoked` event tagged with the invocation that ran it.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::ToolError;
use crate::observability::RunEvents;

/// Captured result of one tool invocation
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolOutput {
    pub tool: String,
    pub args: Vec<String>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Copy with stdout dropped, for invocations whose stdout is a secret
    pub fn redacted(&self) -> Self {
        Self {
            stdout: "<redacted>".to_string(),
            ..self.clone()
        }
    }

    /// Log the raw result at a level matching the exit status
    pub fn log(&self) {
        if self.success() {
            info!(
                "{} exited with status 0 in {:.1}s",
                self.tool,
                self.duration.as_secs_f64()
            );
        } else {
            warn!(
                "{} exited with status {:?} in {:.1}s",
                self.tool,
                self.exit_code,
                self.duration.as_secs_f64()
            );
        }
        if !self.stdout.trim().is_empty() {
            info!("{} stdout: {}", self.tool, self.stdout.trim());
        }
        if !self.stderr.trim().is_empty() {
            info!("{} stderr: {}", self.tool, self.stderr.trim());
        }
    }
}

/// Runs tools with a fixed writable home directory on behalf of one invocation
#[derive(Debug, Clone)]
pub struct ToolRunner {
    work_home: PathBuf,
    events: RunEvents,
}

impl ToolRunner {
    pub fn new(work_home: impl Into<PathBuf>, events: RunEvents) -> Self {
        Self {
            work_home: work_home.into(),
            events,
        }
    }

    /// Run `program args...`, optionally feeding `stdin`, and capture the result
    ///
    /// A non-zero exit is not an error here; callers decide what it means.
    pub async fn run(
        &self,
        tool: &str,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> Result<ToolOutput, ToolError> {
        debug!("Running {} {}", program, args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env("HOME", &self.work_home)
            .current_dir(&self.work_home)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| ToolError::Spawn {
            tool: tool.to_string(),
            message: e.to_string(),
        })?;

        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                // A child that exits without reading stdin closes the pipe;
                // its exit status reports that, not the write.
                if let Err(e) = pipe.write_all(input.as_bytes()).await {
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(ToolError::Spawn {
                            tool: tool.to_string(),
                            message: format!("failed to write stdin: {}", e),
                        });
                    }
                }
                // Close stdin so --password-stdin readers see EOF
                drop(pipe);
            }
        }

        let output = child.wait_with_output().await.map_err(|e| ToolError::Spawn {
            tool: tool.to_string(),
            message: e.to_string(),
        })?;

        let result = ToolOutput {
            tool: tool.to_string(),
            args: args.to_vec(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
        };

        self.events.tool_invoked(&result);

        Ok(result)
    }
}
