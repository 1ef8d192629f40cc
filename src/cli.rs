//! Command-line interface for flagscan.

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::analyzer::{is_source_file, DiffAnalyzer, FsContentSource};
use crate::report::{self, ScanReport, ScannedFile};
use crate::scan::ContentMatcher;

/// Exit codes.
pub const EXIT_CLEAN: i32 = 0;
pub const EXIT_FLAGGED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Feature-flag usage scanner for code review.
///
/// Flagscan detects runtime feature-flag ("flipper") checks in source text
/// and unified diffs, extracts the flag names involved, and builds the
/// review checklist a flag-gated change needs: what to verify with each
/// flag on and off, and how to set up each environment.
#[derive(Parser)]
#[command(name = "flagscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a file or directory tree for flipper usage
    Scan(ScanArgs),
    /// Analyze a unified diff and build review sections
    #[command(visible_alias = "review")]
    Diff(DiffArgs),
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Path to scan (file or directory)
    pub path: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the diff command.
#[derive(Parser)]
pub struct DiffArgs {
    /// Path to a unified diff file; reads stdin when omitted or "-"
    pub diff: Option<PathBuf>,

    /// Base directory for reading files the diff carries no content for
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Output format: pretty, json, or markdown
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Collect source files under a directory.
fn collect_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            // The root was named explicitly; only prune below it.
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            // Skip hidden and vendored directories
            if e.file_type().is_dir()
                && (name.starts_with('.') || name == "node_modules" || name == "vendor")
            {
                return false;
            }
            true
        })
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_source_file(&entry.path().to_string_lossy()) {
            files.push(entry.path().to_path_buf());
        }
    }

    Ok(files)
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    // An explicitly named file is scanned regardless of extension; the
    // filter only applies when walking a tree.
    let files = if metadata.is_dir() {
        collect_files(&args.path)?
    } else {
        vec![args.path.clone()]
    };

    if files.is_empty() {
        eprintln!("Warning: no source files to scan");
        return Ok(EXIT_CLEAN);
    }

    let matcher = ContentMatcher::new();
    let mut report = ScanReport::default();
    let mut seen = std::collections::HashSet::new();

    for file in &files {
        let text = match std::fs::read_to_string(file) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("reading {}: {}", file.display(), e);
                continue;
            }
        };
        let result = matcher.analyze(&text);
        for flag in result.flag_names() {
            if seen.insert(flag.clone()) {
                report.flags.push(flag);
            }
        }
        report.files.push(ScannedFile {
            path: file.to_string_lossy().to_string(),
            detections: result.detections.clone(),
        });
    }

    match args.format.as_str() {
        "json" => report::write_scan_json(&report)?,
        _ => report::write_scan_pretty(&report),
    }

    if report.detection_count() > 0 {
        Ok(EXIT_FLAGGED)
    } else {
        Ok(EXIT_CLEAN)
    }
}

/// Run the diff command.
pub fn run_diff(args: &DiffArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" && args.format != "markdown" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'markdown'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let diff_text = match read_diff_input(args.diff.as_deref()) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let analyzer = DiffAnalyzer::new().content_source(FsContentSource::new(&args.root));
    let result = analyzer.analyze_diff(&diff_text);

    match args.format.as_str() {
        "json" => report::write_json(&result)?,
        "markdown" => report::write_markdown(&result),
        _ => report::write_pretty(&result),
    }

    if result.detection_count() > 0 {
        Ok(EXIT_FLAGGED)
    } else {
        Ok(EXIT_CLEAN)
    }
}

/// Read the diff from a file argument or stdin.
fn read_diff_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .map_err(|e| anyhow::anyhow!("cannot read diff {:?}: {}", p, e)),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}
