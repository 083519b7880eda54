//! Image classification: scratch or regular
//! The build descriptor wins when present; otherwise ask the runtime to
//! start a trivial program and read the failure.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::check::descriptor::BuildDescriptor;
use crate::runtime::{CommandExecutor, ExecRequest, Launch, Target};
use crate::utils::ImageClass;

const PROBE_PROGRAM: &str = "echo";
const PROBE_TEXT: &str = "imgprobe-classify";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    /// Final `FROM` of the build descriptor.
    Descriptor { path: PathBuf, base: String },
    /// Outcome of starting a trivial program in the target.
    Runtime { detail: String },
    /// Nothing conclusive; fell back to `Regular`.
    Default { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub class: ImageClass,
    pub evidence: Evidence,
}

impl Classification {
    fn new(class: ImageClass, evidence: Evidence) -> Self {
        Self { class, evidence }
    }

    pub fn is_default(&self) -> bool {
        matches!(self.evidence, Evidence::Default { .. })
    }
}

impl std::fmt::Display for Evidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Evidence::Descriptor { path, base } =>
                write!(f, "final stage of {} is FROM {}", path.display(), base),
            Evidence::Runtime { detail } => write!(f, "runtime probe: {}", detail),
            Evidence::Default { reason } => write!(f, "default ({})", reason),
        }
    }
}

pub fn classify(
    descriptor: Option<&BuildDescriptor>,
    target: &Target,
    runner: &dyn CommandExecutor,
) -> Classification {
    if let Some(result) = descriptor.and_then(from_descriptor) {
        info!(class = %result.class, evidence = %result.evidence, "classified");
        return result;
    }

    let result = from_runtime(target, runner);
    if result.is_default() {
        warn!(subject = %target, evidence = %result.evidence,
            "could not tell whether the image is scratch-based; assuming regular");
    } else {
        info!(class = %result.class, evidence = %result.evidence, "classified");
    }
    result
}

fn from_descriptor(descriptor: &BuildDescriptor) -> Option<Classification> {
    let base = descriptor.final_base()?;
    let class = match descriptor.final_stage_is_scratch()? {
        true  => ImageClass::Scratch,
        false => ImageClass::Regular,
    };
    Some(Classification::new(class, Evidence::Descriptor {
        path: descriptor.path.clone(),
        base: base.to_string(),
    }))
}

fn from_runtime(target: &Target, runner: &dyn CommandExecutor) -> Classification {
    let request = ExecRequest::new(target, PROBE_PROGRAM).args([PROBE_TEXT]);

    let output = match runner.execute(&request) {
        Ok(o) => o,
        Err(e) => {
            return Classification::new(ImageClass::Regular, Evidence::Default {
                reason: format!("runtime unavailable: {}", e),
            });
        }
    };

    if output.success() {
        return Classification::new(ImageClass::Regular, Evidence::Runtime {
            detail: format!("`{}` ran", request.command_line()),
        });
    }

    match output.launch() {
        Launch::NotLaunched => Classification::new(ImageClass::Scratch, Evidence::Runtime {
            detail: output.summary(),
        }),
        Launch::RuntimeFailed | Launch::Ran => Classification::new(ImageClass::Regular, Evidence::Default {
            reason: format!("inconclusive probe output: {}", output.summary()),
        }),
    }
}
