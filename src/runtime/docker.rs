//! docker-compatible CLI backend
//! 来源：docker run / docker exec / docker inspect / docker image inspect

use serde::Deserialize;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{CommandExecutor, ExecOutput, ExecRequest, Target};
use crate::utils::{ImgprobeError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ── inspect payloads ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ContainerInspect {
    #[serde(rename = "State", default)]
    state: ContainerState,
}

#[derive(Debug, Default, Deserialize)]
struct ContainerState {
    #[serde(rename = "Running", default)]
    running: bool,
}

#[derive(Debug, Deserialize)]
struct ImageInspect {
    #[serde(rename = "Size", default)]
    size: u64,
}

// ── backend ─────────────────────────────────────────────────────────────────

/// Shells out to `docker` (or any CLI with the same verbs, e.g. podman).
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    fn build_command(&self, request: &ExecRequest) -> Command {
        let mut cmd = Command::new(&self.binary);
        match &request.target {
            Target::Image(image) => {
                cmd.args(["run", "--rm", "--entrypoint", request.program.as_str()]);
                for (key, value) in &request.env {
                    cmd.arg("-e").arg(format!("{}={}", key, value));
                }
                cmd.arg(image);
            }
            Target::Container(container) => {
                cmd.arg("exec");
                for (key, value) in &request.env {
                    cmd.arg("-e").arg(format!("{}={}", key, value));
                }
                cmd.arg(container).arg(&request.program);
            }
        }
        cmd.args(&request.args);
        cmd
    }

    /// Run to completion, capturing output through temp files so that a
    /// chatty child can't block on a full pipe while we poll for the deadline.
    fn capture(&self, mut cmd: Command, timeout: Option<Duration>, what: &str) -> Result<ExecOutput> {
        let mut out_file = tempfile::tempfile()?;
        let mut err_file = tempfile::tempfile()?;

        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(out_file.try_clone()?))
            .stderr(Stdio::from(err_file.try_clone()?));

        let mut child = cmd.spawn()
            .map_err(|e| ImgprobeError::Runtime(format!("cannot start {}: {}", self.binary, e)))?;

        let status = match timeout {
            Some(limit) => wait_with_deadline(&mut child, limit, what)?,
            None        => child.wait()?,
        };

        Ok(ExecOutput {
            exit_code: status.code(),
            stdout: read_back(&mut out_file)?,
            stderr: read_back(&mut err_file)?,
        })
    }
}

impl CommandExecutor for DockerCli {
    fn execute(&self, request: &ExecRequest) -> Result<ExecOutput> {
        debug!(subject = %request.target, command = %request.command_line(), "exec");
        let output = self.capture(self.build_command(request), request.timeout, &request.program)?;
        debug!(exit_code = ?output.exit_code, "exec finished");
        Ok(output)
    }

    fn container_running(&self, name: &str) -> Result<bool> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["inspect", name]);
        let out = self.capture(cmd, None, "inspect")?;

        // 不存在的容器：inspect 返回非零
        if !out.success() {
            debug!(container = name, error = %out.summary(), "inspect failed");
            return Ok(false);
        }

        let parsed: Vec<ContainerInspect> = serde_json::from_str(&out.stdout)
            .map_err(|e| ImgprobeError::Parse(format!("inspect JSON: {}", e)))?;

        Ok(parsed.first().map(|c| c.state.running).unwrap_or(false))
    }

    fn image_size(&self, image: &str) -> Result<u64> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["image", "inspect", image]);
        let out = self.capture(cmd, None, "image inspect")?;

        if !out.success() {
            return Err(ImgprobeError::Runtime(format!("image inspect {}: {}", image, out.summary())));
        }

        let parsed: Vec<ImageInspect> = serde_json::from_str(&out.stdout)
            .map_err(|e| ImgprobeError::Parse(format!("image inspect JSON: {}", e)))?;

        parsed.first()
            .map(|i| i.size)
            .ok_or_else(|| ImgprobeError::Parse("empty image inspect result".to_string()))
    }
}

// ── 工具 ────────────────────────────────────────────────────────────────────

fn wait_with_deadline(child: &mut Child, limit: Duration, what: &str) -> Result<ExitStatus> {
    let started = Instant::now();
    loop {
        match child.try_wait()? {
            Some(status) => return Ok(status),
            None if started.elapsed() > limit => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ImgprobeError::Timeout {
                    program: what.to_string(),
                    seconds: limit.as_secs(),
                });
            }
            None => std::thread::sleep(POLL_INTERVAL),
        }
    }
}

fn read_back(file: &mut std::fs::File) -> Result<String> {
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
