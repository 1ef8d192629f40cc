//! Review-artifact synthesis and output formatting.
//!
//! Two jobs live here: rendering the fixed markdown sections (QA checklist
//! and environment-setup brief) from a list of flag names, and writing
//! whole analysis results in the CLI's output formats (pretty, json,
//! markdown).

use colored::*;
use serde::{Deserialize, Serialize};

use crate::analyzer::DiffAnalysisResult;
use crate::scan::Detection;

/// Fixed link included in every environment-setup brief.
const ROLLOUT_GUIDE_URL: &str = "https://wiki.internal/flipper-rollout";

/// The two markdown blocks inserted into a pull-request description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSections {
    pub qa: String,
    pub details: String,
}

/// Render the review sections for a set of flag names.
///
/// Pure string formatting: the only branch is the empty-list guard, which
/// yields empty sections rather than a templated "no flags found" message.
pub fn build_sections(flags: &[String]) -> ReportSections {
    if flags.is_empty() {
        return ReportSections::default();
    }
    ReportSections {
        qa: qa_section(flags),
        details: details_section(flags),
    }
}

fn qa_section(flags: &[String]) -> String {
    let mut out = String::new();
    out.push_str("## QA checklist\n\n");
    out.push_str("This change is gated behind the following feature flags:\n\n");
    for flag in flags {
        out.push_str(&format!("### `{}`\n", flag));
        out.push_str(&format!(
            "- [ ] Verify the affected flows with `{}` **enabled**\n",
            flag
        ));
        out.push_str(&format!(
            "- [ ] Verify the affected flows with `{}` **disabled**\n",
            flag
        ));
        out.push_str(&format!(
            "- [ ] Schedule removal of `{}` once fully rolled out\n\n",
            flag
        ));
    }
    out
}

fn details_section(flags: &[String]) -> String {
    let mut out = String::new();
    out.push_str("## Environment setup\n\n");

    out.push_str("### Staging\n");
    for flag in flags {
        out.push_str(&format!(
            "1. Enable `{}` in the staging flipper dashboard\n",
            flag
        ));
    }
    out.push_str("1. Smoke-test the affected flows before sign-off\n\n");

    out.push_str("### Production\n");
    out.push_str("1. Coordinate the rollout window in #release-coordination\n");
    for flag in flags {
        out.push_str(&format!(
            "1. Enable `{}` for internal users first, then ramp\n",
            flag
        ));
    }
    out.push_str("1. Watch the error dashboards during ramp-up\n\n");

    out.push_str(&format!("Rollout guide: {}\n", ROLLOUT_GUIDE_URL));
    out
}

// =============================================================================
// CLI output formats
// =============================================================================

/// Results of scanning files directly (the `scan` subcommand).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub files: Vec<ScannedFile>,
    /// Unique resolved flag names across all files, first-appearance order.
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedFile {
    pub path: String,
    pub detections: Vec<Detection>,
}

impl ScanReport {
    pub fn detection_count(&self) -> usize {
        self.files.iter().map(|f| f.detections.len()).sum()
    }
}

fn print_detection(detection: &Detection) {
    let location = format!("{}:{}", detection.line, detection.column);
    let flag = detection
        .flag
        .as_deref()
        .map(|f| f.cyan().to_string())
        .unwrap_or_else(|| "-".dimmed().to_string());
    println!(
        "  {:>8}  {:<28} {:<28} {}",
        location.dimmed(),
        detection.category.as_str().yellow(),
        flag,
        detection.rule
    );
}

/// Write a diff analysis in human-readable form.
pub fn write_pretty(result: &DiffAnalysisResult) {
    println!("{}", result.summary.bold());

    for file in &result.files {
        if file.detections.is_empty() {
            continue;
        }
        println!();
        println!("{} ({})", file.path.bold(), file.status);
        for detection in &file.detections {
            print_detection(detection);
        }
    }

    if !result.flags.is_empty() {
        println!();
        println!("{}", "Flags touched:".bold());
        for flag in &result.flags {
            println!("  - {}", flag.cyan());
        }
    }
}

/// Write a diff analysis as JSON.
pub fn write_json(result: &DiffAnalysisResult) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

/// Write only the two review sections, ready to paste into a PR
/// description.
pub fn write_markdown(result: &DiffAnalysisResult) {
    if result.qa_section.is_empty() && result.details_section.is_empty() {
        return;
    }
    println!("{}", result.qa_section);
    println!("{}", result.details_section);
}

/// Write a file scan in human-readable form.
pub fn write_scan_pretty(report: &ScanReport) {
    let detections = report.detection_count();
    if detections == 0 {
        println!("{}", "no flipper usage found".bold());
        return;
    }
    let touched = report
        .files
        .iter()
        .filter(|f| !f.detections.is_empty())
        .count();
    println!(
        "{}",
        format!("{} flipper usage(s) in {} file(s)", detections, touched).bold()
    );

    for file in &report.files {
        if file.detections.is_empty() {
            continue;
        }
        println!();
        println!("{}", file.path.bold());
        for detection in &file.detections {
            print_detection(detection);
        }
    }

    if !report.flags.is_empty() {
        println!();
        println!("{}", "Flags touched:".bold());
        for flag in &report.flags {
            println!("  - {}", flag.cyan());
        }
    }
}

/// Write a file scan as JSON.
pub fn write_scan_json(report: &ScanReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
