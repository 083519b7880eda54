//! Build descriptor (Dockerfile) inspection
//! Only two questions are asked of it: what does the final stage build
//! FROM, and does the final stage copy a CA bundle in.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::check::certs::CA_BUNDLE_PATHS;
use crate::utils::Result;

#[derive(Debug, Clone)]
pub struct BuildDescriptor {
    pub path: PathBuf,
    /// Logical instructions: comments dropped, `\` continuations joined.
    instructions: Vec<String>,
}

impl BuildDescriptor {
    /// `Ok(None)` when there is no file at `path`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "loaded build descriptor");
                Ok(Some(Self::from_text(path, text)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Like `load`, but unreadable files are logged and treated as absent.
    pub fn load_or_skip(path: &Path) -> Option<Self> {
        match Self::load(path) {
            Ok(d) => d,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable build descriptor");
                None
            }
        }
    }

    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self { path: path.into(), instructions: instructions(&text) }
    }

    /// Base image of the last `FROM` instruction. Earlier stages are builders.
    pub fn final_base(&self) -> Option<&str> {
        self.instructions.iter().filter_map(|i| from_base(i)).last()
    }

    pub fn final_stage_is_scratch(&self) -> Option<bool> {
        self.final_base().map(|base| base == "scratch")
    }

    /// File name of the first known CA bundle that a `COPY`/`ADD` of the
    /// final stage names as a path.
    pub fn ca_bundle_reference(&self) -> Option<&'static str> {
        let final_stage = self.instructions.iter()
            .rposition(|i| from_base(i).is_some())
            .map(|start| &self.instructions[start + 1..])
            .unwrap_or(&[]);

        let paths: Vec<&str> = final_stage.iter()
            .filter(|i| is_copy(i))
            .flat_map(|i| i.split_whitespace().skip(1))
            .filter(|t| !t.starts_with("--"))
            .map(|t| t.trim_matches(|c: char| matches!(c, '[' | ']' | '"' | ',')))
            .collect();

        CA_BUNDLE_PATHS.iter().copied().find_map(|bundle| {
            let name = bundle.rsplit('/').next()?;
            let suffix = format!("/{}", name);
            paths.iter()
                .any(|p| *p == bundle || *p == name || p.ends_with(&suffix))
                .then_some(name)
        })
    }
}

/// Joins `\` continuations and drops comment lines, which Docker strips
/// even in the middle of a continued instruction.
fn instructions(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        match line.strip_suffix('\\') {
            Some(head) => {
                current.push_str(head);
                current.push(' ');
            }
            None => {
                current.push_str(line);
                if !current.trim().is_empty() {
                    out.push(current.trim().to_string());
                }
                current.clear();
            }
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

fn is_copy(instruction: &str) -> bool {
    instruction.split_whitespace()
        .next()
        .map(|k| k.eq_ignore_ascii_case("COPY") || k.eq_ignore_ascii_case("ADD"))
        .unwrap_or(false)
}

/// `FROM [--platform=..] <image> [AS name]` → `<image>`
fn from_base(line: &str) -> Option<&str> {
    let mut tokens = line.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("FROM") {
        return None;
    }
    tokens.find(|t| !t.starts_with("--"))
}
