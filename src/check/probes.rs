//! Security battery for `security-check`
//! Each probe gets the shared classification and returns one or more
//! results; nothing here aborts the run.

use tracing::debug;

use crate::check::certs;
use crate::check::output::fmt_bytes;
use crate::check::report::{Probe, ProbeResult};
use crate::check::ProbeContext;
use crate::runtime::{ExecOutput, ExecRequest, Launch};
use crate::utils::Result;

pub const SENTINEL_KEY: &str = "IMGPROBE_SENTINEL";
pub const SENTINEL_VALUE: &str = "imgprobe-env-leak-7f3a9c";

/// Credential and user-database files that shouldn't ship in an image.
pub const SENSITIVE_PATHS: &[&str] = &[
    "/etc/shadow",
    "/etc/gshadow",
    "/etc/passwd",
    "/etc/group",
    "/root/.ssh/id_rsa",
];

pub fn run_all(ctx: &ProbeContext<'_>, app_binary: Option<&str>) -> Vec<ProbeResult> {
    let mut results = vec![
        interpreter_access(ctx, Probe::ShellAccess, "/bin/sh"),
        interpreter_access(ctx, Probe::BashAccess, "/bin/bash"),
        env_exposure(ctx),
        arbitrary_command(ctx),
        root_user(ctx),
    ];
    results.extend(sensitive_files(ctx));
    results.push(app_binary_reachable(ctx, app_binary));
    results.push(image_size(ctx));
    results.push(certs::ca_certificates(ctx));
    results
}

// ── interpreters ────────────────────────────────────────────────────────────

pub fn interpreter_access(ctx: &ProbeContext<'_>, probe: Probe, interpreter: &str) -> ProbeResult {
    let request = ExecRequest::new(ctx.target, interpreter).args(["-c", "echo ok"]);
    let output = match ctx.execute(&request) {
        Ok(o) => o,
        Err(e) => return ProbeResult::fail(probe, format!("could not probe {}: {}", interpreter, e)),
    };

    if output.success() {
        return ProbeResult::fail(probe, format!("shell access possible via {}", interpreter));
    }
    match output.launch() {
        Launch::RuntimeFailed => ProbeResult::fail(probe, runtime_failure(&output)),
        _ if ctx.class.is_scratch() => ProbeResult::pass(probe, format!("{} not present (scratch image)", interpreter)),
        _ => ProbeResult::pass(probe, format!("{} not usable: {}", interpreter, output.summary())),
    }
}

// ── env / arbitrary commands ────────────────────────────────────────────────

pub fn env_exposure(ctx: &ProbeContext<'_>) -> ProbeResult {
    let probe = Probe::EnvExposure;
    if ctx.class.is_scratch() {
        return ProbeResult::pass(probe, "no environment dump tool in a scratch image");
    }

    let request = ExecRequest::new(ctx.target, "env").env(SENTINEL_KEY, SENTINEL_VALUE);
    let output = match ctx.execute(&request) {
        Ok(o) => o,
        Err(e) => return ProbeResult::fail(probe, format!("could not probe env: {}", e)),
    };

    let sentinel = format!("{}={}", SENTINEL_KEY, SENTINEL_VALUE);
    match output.launch() {
        Launch::RuntimeFailed => ProbeResult::fail(probe, runtime_failure(&output)),
        Launch::NotLaunched => ProbeResult::pass(probe, "env not available"),
        Launch::Ran if output.stdout.lines().any(|l| l.trim() == sentinel) =>
            ProbeResult::fail(probe, "environment variables readable through `env`"),
        Launch::Ran => ProbeResult::pass(probe, "injected variable not visible"),
    }
}

pub fn arbitrary_command(ctx: &ProbeContext<'_>) -> ProbeResult {
    let probe = Probe::ArbitraryCommand;
    if ctx.class.is_scratch() {
        return ProbeResult::pass(probe, "only the application entrypoint exists");
    }

    let request = ExecRequest::new(ctx.target, "id");
    match ctx.execute(&request) {
        Err(e) => ProbeResult::fail(probe, format!("could not probe `id`: {}", e)),
        Ok(out) if out.success() =>
            ProbeResult::fail(probe, format!("`id` ran: {}", out.stdout.trim())),
        Ok(out) => match out.launch() {
            Launch::RuntimeFailed => ProbeResult::fail(probe, runtime_failure(&out)),
            _ => ProbeResult::pass(probe, "unrelated commands cannot run"),
        },
    }
}

// ── user ────────────────────────────────────────────────────────────────────

pub fn root_user(ctx: &ProbeContext<'_>) -> ProbeResult {
    let probe = Probe::RootUser;
    if ctx.class.is_scratch() {
        return ProbeResult::skip(probe, "no user model in a scratch image");
    }

    let request = ExecRequest::new(ctx.target, "id").args(["-u"]);
    let output = match ctx.execute(&request) {
        Ok(o) if o.success() => o,
        Ok(o) => return ProbeResult::warn(probe, format!("could not determine uid: {}", o.summary())),
        Err(e) => return ProbeResult::warn(probe, format!("could not determine uid: {}", e)),
    };

    match parse_uid(&output.stdout) {
        Some(0)   => ProbeResult::warn(probe, "runs as root (uid 0)"),
        Some(uid) => ProbeResult::pass(probe, format!("runs as uid {}", uid)),
        None      => ProbeResult::warn(probe, format!("unexpected `id -u` output: {:?}", output.stdout.trim())),
    }
}

fn parse_uid(stdout: &str) -> Option<u32> {
    stdout.trim().parse().ok()
}

// ── files ───────────────────────────────────────────────────────────────────

pub fn sensitive_files(ctx: &ProbeContext<'_>) -> Vec<ProbeResult> {
    let probe = Probe::SensitiveFile;
    SENSITIVE_PATHS.iter().map(|path| {
        if ctx.class.is_scratch() {
            return ProbeResult::pass(probe, format!("{} absent (scratch image)", path));
        }
        match ctx.path_exists(path, "-e") {
            Ok(Some(true))  => ProbeResult::fail(probe, format!("{} present", path)),
            Ok(Some(false)) => ProbeResult::pass(probe, format!("{} absent", path)),
            Ok(None)        => ProbeResult::warn(probe, format!("cannot check {}: `test` unavailable", path)),
            Err(e)          => ProbeResult::fail(probe, format!("cannot check {}: {}", path, e)),
        }
    }).collect()
}

// ── application ─────────────────────────────────────────────────────────────

pub fn app_binary_reachable(ctx: &ProbeContext<'_>, app_binary: Option<&str>) -> ProbeResult {
    let probe = Probe::AppBinary;
    let Some(path) = app_binary else {
        return ProbeResult::skip(probe, "no binary path given");
    };

    let request = ExecRequest::new(ctx.target, path).args(["--help"]);
    match ctx.execute(&request) {
        Ok(out) if out.success() => ProbeResult::pass(probe, format!("{} --help exited 0", path)),
        Ok(out) => ProbeResult::fail(probe, format!(
            "{} --help failed (exit {}): {}",
            path,
            out.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()),
            out.summary(),
        )),
        Err(e) => ProbeResult::fail(probe, format!("{} could not be started: {}", path, e)),
    }
}

pub fn image_size(ctx: &ProbeContext<'_>) -> ProbeResult {
    let probe = Probe::ImageSize;
    match ctx.runner.image_size(ctx.target.name()) {
        Ok(bytes) => ProbeResult::info(probe, fmt_bytes(bytes)),
        Err(e)    => ProbeResult::info(probe, format!("size unavailable: {}", e)),
    }
}

// ── 工具 ────────────────────────────────────────────────────────────────────

pub(crate) fn runtime_failure(output: &ExecOutput) -> String {
    format!("runtime error: {}", output.summary())
}

impl ProbeContext<'_> {
    pub(crate) fn execute(&self, request: &ExecRequest) -> Result<ExecOutput> {
        let output = self.runner.execute(request);
        if let Err(e) = &output {
            debug!(command = %request.command_line(), error = %e, "probe command failed");
        }
        output
    }

    /// `test <flag> <path>` in the target. `Ok(None)` when `test` itself
    /// can't be started there.
    pub(crate) fn path_exists(&self, path: &str, flag: &str) -> Result<Option<bool>> {
        let request = ExecRequest::new(self.target, "test").args([flag, path]);
        let output = self.execute(&request)?;
        Ok(match output.launch() {
            Launch::Ran => Some(output.success()),
            Launch::NotLaunched => None,
            Launch::RuntimeFailed => {
                return Err(crate::utils::ImgprobeError::Runtime(output.summary()));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::report::ProbeStatus;
    use crate::runtime::fake::FakeRuntime;
    use crate::runtime::Target;
    use crate::utils::ImageClass;

    fn ctx<'a>(runner: &'a FakeRuntime, target: &'a Target, class: ImageClass) -> ProbeContext<'a> {
        ProbeContext { runner, target, class, descriptor: None, timeout: std::time::Duration::from_secs(10) }
    }

    fn image() -> Target {
        Target::Image("app:latest".into())
    }

    #[test]
    fn scratch_env_and_command_probes_issue_no_commands() {
        let rt = FakeRuntime::new().on("env", 0, "IMGPROBE_SENTINEL=imgprobe-env-leak-7f3a9c\n", "").on("id", 0, "uid=0(root)\n", "");
        let t = image();
        let c = ctx(&rt, &t, ImageClass::Scratch);
        assert_eq!(env_exposure(&c).status, ProbeStatus::Pass);
        assert_eq!(arbitrary_command(&c).status, ProbeStatus::Pass);
        assert_eq!(root_user(&c).status, ProbeStatus::Skip);
        assert_eq!(rt.call_count(), 0);
    }

    #[test]
    fn echoed_sentinel_fails_env_probe() {
        let rt = FakeRuntime::new().on("env", 0, "PATH=/usr/bin\nIMGPROBE_SENTINEL=imgprobe-env-leak-7f3a9c\n", "");
        let t = image();
        let result = env_exposure(&ctx(&rt, &t, ImageClass::Regular));
        assert_eq!(result.status, ProbeStatus::Fail);

        let calls = rt.calls.borrow();
        assert_eq!(calls[0].env, vec![(SENTINEL_KEY.to_string(), SENTINEL_VALUE.to_string())]);
    }

    #[test]
    fn env_output_without_sentinel_passes() {
        let rt = FakeRuntime::new().on("env", 0, "PATH=/usr/bin\n", "");
        let t = image();
        assert_eq!(env_exposure(&ctx(&rt, &t, ImageClass::Regular)).status, ProbeStatus::Pass);
    }

    #[test]
    fn working_shell_fails_regardless_of_class() {
        let rt = FakeRuntime::new().on("/bin/sh -c echo ok", 0, "ok\n", "");
        let t = image();
        assert_eq!(interpreter_access(&ctx(&rt, &t, ImageClass::Scratch), Probe::ShellAccess, "/bin/sh").status, ProbeStatus::Fail);
        assert_eq!(interpreter_access(&ctx(&rt, &t, ImageClass::Regular), Probe::ShellAccess, "/bin/sh").status, ProbeStatus::Fail);
        // bash isn't scripted, so the fake answers 127
        assert_eq!(interpreter_access(&ctx(&rt, &t, ImageClass::Regular), Probe::BashAccess, "/bin/bash").status, ProbeStatus::Pass);
    }

    #[test]
    fn unreachable_runtime_fails_shell_probe() {
        let rt = FakeRuntime::new().broken("/bin/sh");
        let t = image();
        assert_eq!(interpreter_access(&ctx(&rt, &t, ImageClass::Regular), Probe::ShellAccess, "/bin/sh").status, ProbeStatus::Fail);
    }

    #[test]
    fn root_uid_warns_and_other_uids_pass() {
        let t = image();
        let root = FakeRuntime::new().on("id -u", 0, "0\n", "");
        assert_eq!(root_user(&ctx(&root, &t, ImageClass::Regular)).status, ProbeStatus::Warn);

        let nobody = FakeRuntime::new().on("id -u", 0, "65534\n", "");
        assert_eq!(root_user(&ctx(&nobody, &t, ImageClass::Regular)).status, ProbeStatus::Pass);

        let missing = FakeRuntime::new();
        assert_eq!(root_user(&ctx(&missing, &t, ImageClass::Regular)).status, ProbeStatus::Warn);
    }

    #[test]
    fn arbitrary_command_success_fails() {
        let rt = FakeRuntime::new().on("id", 0, "uid=1000(app) gid=1000(app)\n", "");
        let t = image();
        assert_eq!(arbitrary_command(&ctx(&rt, &t, ImageClass::Regular)).status, ProbeStatus::Fail);
    }

    #[test]
    fn sensitive_files_are_checked_one_by_one() {
        let rt = FakeRuntime::new()
            .on("test -e", 1, "", "")
            .on("test -e /etc/passwd", 0, "", "");
        let t = image();
        let results = sensitive_files(&ctx(&rt, &t, ImageClass::Regular));
        assert_eq!(results.len(), SENSITIVE_PATHS.len());
        let failed: Vec<&str> = results.iter()
            .filter(|r| r.status == ProbeStatus::Fail)
            .map(|r| r.message.as_str())
            .collect();
        assert_eq!(failed, vec!["/etc/passwd present"]);
    }

    #[test]
    fn scratch_sensitive_files_pass_without_commands() {
        let rt = FakeRuntime::new();
        let t = image();
        let results = sensitive_files(&ctx(&rt, &t, ImageClass::Scratch));
        assert!(results.iter().all(|r| r.status == ProbeStatus::Pass));
        assert_eq!(rt.call_count(), 0);
    }

    #[test]
    fn app_binary_probe() {
        let t = image();
        let rt = FakeRuntime::new().on("/app --help", 0, "usage: app\n", "");
        let c = ctx(&rt, &t, ImageClass::Scratch);
        assert_eq!(app_binary_reachable(&c, None).status, ProbeStatus::Skip);
        assert_eq!(app_binary_reachable(&c, Some("/app")).status, ProbeStatus::Pass);
        assert_eq!(app_binary_reachable(&c, Some("/missing")).status, ProbeStatus::Fail);
    }

    #[test]
    fn image_size_is_informational() {
        let t = image();
        let mut rt = FakeRuntime::new();
        assert_eq!(image_size(&ctx(&rt, &t, ImageClass::Regular)).status, ProbeStatus::Info);
        rt.size = Some(3 * 1024 * 1024);
        let r = image_size(&ctx(&rt, &t, ImageClass::Regular));
        assert_eq!((r.status, r.message.as_str()), (ProbeStatus::Info, "3.0MiB"));
    }
}
