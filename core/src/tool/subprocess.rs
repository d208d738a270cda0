use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::ToolError;

use super::ToolOutput;

#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub envs: HashMap<String, String>,
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

/// Runs a program to completion and captures its output.
///
/// A nonzero exit status is returned as data. Failing to spawn and running
/// past `timeout` are errors; on timeout the child is killed.
pub async fn run_command(spec: &CommandSpec, timeout: Duration) -> Result<ToolOutput, ToolError> {
    let started = Instant::now();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(&spec.envs)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    tracing::debug!(program = %spec.program, args = ?spec.args, "spawning");
    let mut child = cmd.spawn().map_err(|source| ToolError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    // stdin is written alongside output collection, both under the timeout.
    let feeder = match (spec.stdin.clone(), child.stdin.take()) {
        (Some(input), Some(mut stdin)) => Some(tokio::spawn(async move {
            let res = stdin.write_all(input.as_bytes()).await;
            drop(stdin);
            res
        })),
        _ => None,
    };

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(res) => res?,
        Err(_) => {
            if let Some(feeder) = feeder {
                feeder.abort();
            }
            tracing::warn!(program = %spec.program, secs = timeout.as_secs(), "process timed out");
            return Err(ToolError::Timeout {
                program: spec.program.clone(),
                secs: timeout.as_secs(),
            });
        }
    };

    if let Some(feeder) = feeder {
        match feeder.await {
            Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                tracing::warn!(program = %spec.program, error = %e, "writing stdin failed");
            }
            _ => {}
        }
    }

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
        duration: started.elapsed(),
    })
}
