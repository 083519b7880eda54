//! Probe results and the per-run report

use crate::check::classify::Classification;
use crate::runtime::Target;

/// Every probe the runner knows, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Probe {
    ShellAccess,
    BashAccess,
    EnvExposure,
    ArbitraryCommand,
    RootUser,
    SensitiveFile,
    AppBinary,
    ImageSize,
    CaCertificates,
    HttpsConnectivity,
    MailHandshake,
    ToolVersion,
}

impl Probe {
    pub fn name(self) -> &'static str {
        match self {
            Probe::ShellAccess       => "Shell access",
            Probe::BashAccess        => "Bash access",
            Probe::EnvExposure       => "Env-var exposure",
            Probe::ArbitraryCommand  => "Arbitrary command",
            Probe::RootUser          => "Root user",
            Probe::SensitiveFile     => "Sensitive file",
            Probe::AppBinary         => "App binary",
            Probe::ImageSize         => "Image size",
            Probe::CaCertificates    => "CA certificates",
            Probe::HttpsConnectivity => "HTTPS",
            Probe::MailHandshake     => "SMTP STARTTLS",
            Probe::ToolVersion       => "TLS tool",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Pass,
    Fail,
    Warn,
    /// Not applicable to this image.
    Skip,
    /// Reported for the reader; never a verdict.
    Info,
}

impl ProbeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Warn => "WARN",
            Self::Skip => "SKIP",
            Self::Info => "INFO",
        }
    }

    pub fn as_colored(self) -> &'static str {
        match self {
            Self::Pass => "\u{1b}[32mPASS\u{1b}[0m",
            Self::Fail => "\u{1b}[31mFAIL\u{1b}[0m",
            Self::Warn => "\u{1b}[33mWARN\u{1b}[0m",
            Self::Skip => "\u{1b}[90mSKIP\u{1b}[0m",
            Self::Info => "\u{1b}[36mINFO\u{1b}[0m",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub probe: Probe,
    pub status: ProbeStatus,
    pub message: String,
}

impl ProbeResult {
    pub fn new(probe: Probe, status: ProbeStatus, message: impl Into<String>) -> Self {
        Self { probe, status, message: message.into() }
    }

    pub fn pass(probe: Probe, message: impl Into<String>) -> Self {
        Self::new(probe, ProbeStatus::Pass, message)
    }

    pub fn fail(probe: Probe, message: impl Into<String>) -> Self {
        Self::new(probe, ProbeStatus::Fail, message)
    }

    pub fn warn(probe: Probe, message: impl Into<String>) -> Self {
        Self::new(probe, ProbeStatus::Warn, message)
    }

    pub fn skip(probe: Probe, message: impl Into<String>) -> Self {
        Self::new(probe, ProbeStatus::Skip, message)
    }

    pub fn info(probe: Probe, message: impl Into<String>) -> Self {
        Self::new(probe, ProbeStatus::Info, message)
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub collected_at: String,
    pub target: Target,
    pub classification: Classification,
    results: Vec<ProbeResult>,
    has_failures: bool,
}

impl RunReport {
    pub fn new(target: Target, classification: Classification) -> Self {
        Self {
            collected_at: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S %z")
                .to_string(),
            target,
            classification,
            results: Vec::new(),
            has_failures: false,
        }
    }

    pub fn push(&mut self, result: ProbeResult) {
        self.has_failures |= result.status == ProbeStatus::Fail;
        self.results.push(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ProbeResult>) {
        for r in results {
            self.push(r);
        }
    }

    /// Results in probe order; several results of one probe keep their
    /// insertion order.
    pub fn results(&self) -> Vec<&ProbeResult> {
        let mut sorted: Vec<&ProbeResult> = self.results.iter().collect();
        sorted.sort_by_key(|r| r.probe);
        sorted
    }

    pub fn has_failures(&self) -> bool {
        self.has_failures
    }

    pub fn count(&self, status: ProbeStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn exit_code(&self) -> i32 {
        if self.has_failures { 1 } else { 0 }
    }
}
