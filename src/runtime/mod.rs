//! Container runtime access
//! Everything the checks need from docker goes through `CommandExecutor`,
//! so tests can script the runtime without a daemon.

mod docker;

pub use docker::DockerCli;

use std::time::Duration;
use crate::utils::Result;

/// Text a runtime prints when the requested program can't be started.
const NOT_FOUND_SIGNATURES: &[&str] = &[
    "no such file or directory",
    "executable file not found",
    "exec format error",
    "not found",
];

/// Subset of the signatures that identify an exec failure, as opposed to
/// e.g. a missing image manifest.
const EXEC_SIGNATURES: &[&str] = &[
    "no such file or directory",
    "executable file not found",
    "exec format error",
];

pub trait CommandExecutor {
    fn execute(&self, request: &ExecRequest) -> Result<ExecOutput>;

    fn container_running(&self, name: &str) -> Result<bool>;

    /// Image size in bytes.
    fn image_size(&self, image: &str) -> Result<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Throwaway container created from an image (`run --rm`)
    Image(String),
    /// Container that is already running (`exec`)
    Container(String),
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Target::Image(n) | Target::Container(n) => n,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Image(n)     => write!(f, "image {}", n),
            Target::Container(n) => write!(f, "container {}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub target: Target,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl ExecRequest {
    pub fn new(target: &Target, program: &str) -> Self {
        Self {
            target: target.clone(),
            program: program.to_string(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `program arg1 arg2`, for messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// How far a request got inside the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// The program started; its own exit code is meaningful.
    Ran,
    /// The program isn't there or can't be executed in the target.
    NotLaunched,
    /// The runtime failed before reaching the program (daemon, missing image).
    RuntimeFailed,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit codes 126/127 are the runtime's own "cannot execute" and
    /// "not found"; 125 is a runtime error unless the text says exec failed.
    pub fn launch(&self) -> Launch {
        match self.exit_code {
            Some(0) => Launch::Ran,
            Some(126) | Some(127) => Launch::NotLaunched,
            Some(125) if self.mentions(EXEC_SIGNATURES) => Launch::NotLaunched,
            Some(125) | None => Launch::RuntimeFailed,
            Some(_) if self.mentions(NOT_FOUND_SIGNATURES) => Launch::NotLaunched,
            Some(_) => Launch::Ran,
        }
    }

    /// First non-empty line of stderr, else stdout.
    pub fn summary(&self) -> String {
        [&self.stderr, &self.stdout]
            .iter()
            .flat_map(|s| s.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
            .to_string()
    }

    fn mentions(&self, needles: &[&str]) -> bool {
        let text = format!("{}\n{}", self.stderr, self.stdout).to_lowercase();
        needles.iter().any(|n| text.contains(n))
    }
}
