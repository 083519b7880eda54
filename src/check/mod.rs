pub mod certs;
pub mod classify;
pub mod descriptor;
pub mod output;
pub mod probes;
pub mod report;

use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::runtime::{CommandExecutor, Target};
use crate::utils::{ImageClass, ImgprobeError, Result};
use descriptor::BuildDescriptor;
use report::RunReport;

/// What every probe sees. Built once, after classification.
pub struct ProbeContext<'a> {
    pub runner: &'a dyn CommandExecutor,
    pub target: &'a Target,
    pub class: ImageClass,
    pub descriptor: Option<&'a BuildDescriptor>,
    /// Bound for network probes.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub dockerfile: PathBuf,
    pub timeout: Duration,
    pub color: bool,
}

pub fn run_security_check(
    runner: &dyn CommandExecutor,
    settings: &Settings,
    image: &str,
    app_binary: Option<&str>,
) -> Result<RunReport> {
    let report = security_report(runner, settings, image, app_binary)?;
    output::display(&report, "SECURITY CHECK", settings.color);
    Ok(report)
}

pub fn run_certificate_check(
    runner: &dyn CommandExecutor,
    settings: &Settings,
    container: &str,
) -> Result<RunReport> {
    let report = certificate_report(runner, settings, container)?;
    output::display(&report, "CERTIFICATE CHECK", settings.color);
    Ok(report)
}

pub fn security_report(
    runner: &dyn CommandExecutor,
    settings: &Settings,
    image: &str,
    app_binary: Option<&str>,
) -> Result<RunReport> {
    if image.trim().is_empty() {
        return Err(ImgprobeError::Precondition("image name must not be empty".to_string()));
    }

    let target = Target::Image(image.to_string());
    let descriptor = BuildDescriptor::load_or_skip(&settings.dockerfile);

    info!(subject = %target, "classifying");
    let classification = classify::classify(descriptor.as_ref(), &target, runner);

    let ctx = ProbeContext {
        runner,
        target: &target,
        class: classification.class,
        descriptor: descriptor.as_ref(),
        timeout: settings.timeout,
    };
    info!(class = %ctx.class, "running security probes");
    let results = probes::run_all(&ctx, app_binary);

    let mut report = RunReport::new(target.clone(), classification);
    report.extend(results);
    Ok(report)
}

pub fn certificate_report(
    runner: &dyn CommandExecutor,
    settings: &Settings,
    container: &str,
) -> Result<RunReport> {
    if !runner.container_running(container)? {
        return Err(ImgprobeError::Precondition(format!("container {} is not running", container)));
    }

    let target = Target::Container(container.to_string());
    let descriptor = BuildDescriptor::load_or_skip(&settings.dockerfile);

    info!(subject = %target, "classifying");
    let classification = classify::classify(descriptor.as_ref(), &target, runner);

    let ctx = ProbeContext {
        runner,
        target: &target,
        class: classification.class,
        descriptor: descriptor.as_ref(),
        timeout: settings.timeout,
    };
    info!(class = %ctx.class, "running certificate probes");
    let results = certs::run_all(&ctx);

    let mut report = RunReport::new(target.clone(), classification);
    report.extend(results);
    Ok(report)
}
