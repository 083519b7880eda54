//! 输出层：接收 RunReport，渲染 text

use std::fmt::Write as _;

use crate::check::report::{ProbeStatus, RunReport};

pub fn display(report: &RunReport, title: &str, color: bool) {
    print!("{}", render(report, title, color));
}

pub fn render(report: &RunReport, title: &str, color: bool) -> String {
    let mut out = String::new();

    section(&mut out, title);
    let _ = writeln!(out, "  Target       : {}", report.target);
    let _ = writeln!(out, "  Collected at : {}", report.collected_at);
    let c = &report.classification;
    let _ = writeln!(out, "  Image class  : {}  ({})", c.class, c.evidence);
    if c.is_default() {
        let _ = writeln!(out, "  ⚠  detection inconclusive, treated as a regular image");
    }

    section(&mut out, "RESULTS");
    let results = report.results();
    let width = results.iter().map(|r| r.probe.name().len()).max().unwrap_or(0);
    for r in &results {
        let tag = if color { r.status.as_colored() } else { r.status.as_str() };
        let _ = writeln!(out, "  [{}] {:<w$}  {}", tag, r.probe.name(), r.message, w = width);
    }

    section(&mut out, "SUMMARY");
    let _ = writeln!(out, "  {} passed  {} failed  {} warnings  {} skipped",
        report.count(ProbeStatus::Pass),
        report.count(ProbeStatus::Fail),
        report.count(ProbeStatus::Warn),
        report.count(ProbeStatus::Skip));
    let verdict = match (report.has_failures(), color) {
        (true, true)   => "\u{1b}[31mFAILED\u{1b}[0m",
        (true, false)  => "FAILED",
        (false, true)  => "\u{1b}[32mPASSED\u{1b}[0m",
        (false, false) => "PASSED",
    };
    let _ = writeln!(out, "  Result       : {}", verdict);

    out
}

// ── 格式化工具 ───────────────────────────────────────────────────────────────

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", "─".repeat(60));
    let _ = writeln!(out, "  {}", title);
    let _ = writeln!(out, "{}", "─".repeat(60));
}

pub fn fmt_bytes(b: u64) -> String {
    if b >= 1 << 30 {
        format!("{:.1}GiB", b as f64 / (1u64 << 30) as f64)
    } else if b >= 1 << 20 {
        format!("{:.1}MiB", b as f64 / (1u64 << 20) as f64)
    } else if b >= 1 << 10 {
        format!("{:.1}KiB", b as f64 / (1u64 << 10) as f64)
    } else {
        format!("{}B", b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::classify::{Classification, Evidence};
    use crate::check::report::{Probe, ProbeResult};
    use crate::runtime::Target;
    use crate::utils::ImageClass;

    fn sample(evidence: Evidence) -> RunReport {
        let mut r = RunReport::new(
            Target::Image("app:latest".into()),
            Classification { class: ImageClass::Regular, evidence },
        );
        r.push(ProbeResult::warn(Probe::RootUser, "runs as root (uid 0)"));
        r.push(ProbeResult::pass(Probe::ShellAccess, "/bin/sh not usable"));
        r
    }

    #[test]
    fn plain_rendering_has_no_escape_codes() {
        let text = render(&sample(Evidence::Runtime { detail: "`echo` ran".into() }), "SECURITY CHECK", false);
        assert!(!text.contains('\u{1b}'));
        assert!(text.contains("[PASS] Shell access"));
        assert!(text.contains("Result       : PASSED"));
        assert!(!text.contains("inconclusive"));
        assert!(text.find("Shell access").unwrap() < text.find("Root user").unwrap());
    }

    #[test]
    fn colored_rendering_marks_status() {
        let text = render(&sample(Evidence::Default { reason: "runtime unavailable".into() }), "SECURITY CHECK", true);
        assert!(text.contains("\u{1b}[33mWARN\u{1b}[0m"));
        assert!(text.contains("detection inconclusive"));
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(fmt_bytes(512), "512B");
        assert_eq!(fmt_bytes(2048), "2.0KiB");
        assert_eq!(fmt_bytes(5 * 1024 * 1024 + 512 * 1024), "5.5MiB");
        assert_eq!(fmt_bytes(3 << 30), "3.0GiB");
    }
}
