//! CA bundle presence and outbound TLS checks for `certificate-check`
//! Network probes are advisory: a failed connection may only mean the
//! host's egress policy blocks it.

use std::time::Duration;

use crate::check::probes::runtime_failure;
use crate::check::report::{Probe, ProbeResult};
use crate::check::ProbeContext;
use crate::runtime::{ExecOutput, ExecRequest, Launch};
use crate::utils::Result;

/// Well-known CA bundle locations across distributions.
pub const CA_BUNDLE_PATHS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/ca-bundle.pem",
    "/etc/pki/tls/cacert.pem",
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem",
    "/etc/ssl/cert.pem",
];

pub const HTTPS_ENDPOINTS: &[&str] = &["https://www.google.com", "https://api.github.com"];

pub const SMTP_HOST: &str = "smtp.gmail.com";
pub const SMTP_PORT: u16 = 587;

/// Extra time the host allows on top of the in-container timeout.
const EXEC_GRACE: Duration = Duration::from_secs(5);

pub fn run_all(ctx: &ProbeContext<'_>) -> Vec<ProbeResult> {
    let mut results = vec![ca_certificates(ctx)];
    results.extend(HTTPS_ENDPOINTS.iter().map(|url| https_connectivity(ctx, url)));
    results.push(mail_handshake(ctx));
    results.push(tool_version(ctx));
    results
}

// ── CA bundle ───────────────────────────────────────────────────────────────

pub fn ca_certificates(ctx: &ProbeContext<'_>) -> ProbeResult {
    let probe = Probe::CaCertificates;

    if ctx.class.is_scratch() {
        let Some(descriptor) = ctx.descriptor else {
            return ProbeResult::fail(probe, "scratch image and no build descriptor to look for a CA bundle in");
        };
        return match descriptor.ca_bundle_reference() {
            Some(name) => ProbeResult::pass(probe, format!("{} copies {}", descriptor.path.display(), name)),
            None => ProbeResult::fail(probe, format!("{} does not copy a CA bundle", descriptor.path.display())),
        };
    }

    let mut unchecked = 0;
    for path in CA_BUNDLE_PATHS {
        match ctx.path_exists(path, "-f") {
            Ok(Some(true))  => return ProbeResult::pass(probe, format!("CA bundle at {}", path)),
            Ok(Some(false)) => {}
            Ok(None)        => unchecked += 1,
            Err(e)          => return ProbeResult::fail(probe, format!("cannot check {}: {}", path, e)),
        }
    }

    if unchecked == CA_BUNDLE_PATHS.len() {
        ProbeResult::fail(probe, "cannot check CA bundle locations: `test` unavailable")
    } else {
        ProbeResult::fail(probe, "no CA bundle in any well-known location")
    }
}

// ── network ─────────────────────────────────────────────────────────────────

pub fn https_connectivity(ctx: &ProbeContext<'_>, url: &str) -> ProbeResult {
    let probe = Probe::HttpsConnectivity;
    let secs = ctx.timeout.as_secs().to_string();

    let curl = ExecRequest::new(ctx.target, "curl")
        .args(["-sS", "-o", "/dev/null", "--max-time", secs.as_str(), url])
        .timeout(host_deadline(ctx));

    let mut outcome = ctx.execute(&curl);

    // regular images often ship wget rather than curl
    if !ctx.class.is_scratch() && not_launched(&outcome) {
        let wget = ExecRequest::new(ctx.target, "wget")
            .args(["-q", "-O", "/dev/null", "-T", secs.as_str(), url])
            .timeout(host_deadline(ctx));
        outcome = ctx.execute(&wget);
    }

    match outcome {
        Ok(out) if out.success() => ProbeResult::pass(probe, format!("{} reachable", url)),
        Ok(out) => match out.launch() {
            Launch::NotLaunched => ProbeResult::fail(probe, format!("{}: no transfer tool in image", url)),
            Launch::RuntimeFailed => ProbeResult::fail(probe, format!("{}: {}", url, runtime_failure(&out))),
            Launch::Ran => ProbeResult::fail(probe, format!("{}: {}", url, out.summary())),
        },
        Err(e) => ProbeResult::fail(probe, format!("{}: {}", url, e)),
    }
}

pub fn mail_handshake(ctx: &ProbeContext<'_>) -> ProbeResult {
    let probe = Probe::MailHandshake;
    let endpoint = format!("{}:{}", SMTP_HOST, SMTP_PORT);
    let secs = ctx.timeout.as_secs().to_string();

    let request = if ctx.class.is_scratch() {
        ExecRequest::new(ctx.target, "curl")
            .args(["-sS", "--max-time", secs.as_str(), "--ssl-reqd"])
            .args([format!("smtp://{}", endpoint)])
    } else {
        ExecRequest::new(ctx.target, "openssl")
            .args(["s_client", "-brief", "-starttls", "smtp", "-connect"])
            .args([endpoint.as_str(), "-servername", SMTP_HOST])
    };
    let request = request.timeout(host_deadline(ctx));

    match ctx.execute(&request) {
        Ok(out) if out.success() => ProbeResult::pass(probe, format!("STARTTLS handshake with {} succeeded", endpoint)),
        Ok(out) => ProbeResult::warn(probe, format!(
            "STARTTLS handshake with {} failed: {} (may be expected if outbound mail ports are blocked)",
            endpoint, out.summary(),
        )),
        Err(e) => ProbeResult::warn(probe, format!(
            "STARTTLS handshake with {} failed: {} (may be expected if outbound mail ports are blocked)",
            endpoint, e,
        )),
    }
}

pub fn tool_version(ctx: &ProbeContext<'_>) -> ProbeResult {
    let probe = Probe::ToolVersion;
    let (tool, request) = if ctx.class.is_scratch() {
        ("curl", ExecRequest::new(ctx.target, "curl").args(["--version"]))
    } else {
        ("openssl", ExecRequest::new(ctx.target, "openssl").args(["version"]))
    };

    match ctx.execute(&request) {
        Ok(out) if out.success() => ProbeResult::info(probe, first_line(&out.stdout)),
        Ok(_) | Err(_) => ProbeResult::info(probe, format!("{} not available in image", tool)),
    }
}

// ── 工具 ────────────────────────────────────────────────────────────────────

fn host_deadline(ctx: &ProbeContext<'_>) -> Duration {
    ctx.timeout.saturating_add(EXEC_GRACE)
}

fn not_launched(outcome: &Result<ExecOutput>) -> bool {
    matches!(outcome, Ok(out) if !out.success() && out.launch() == Launch::NotLaunched)
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("").trim().to_string()
}
