//! Comparison report writers.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use photokit_recon::{Item, MatchedPair, ReconResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

fn pair_lines(out: &mut String, heading: &str, pairs: &[MatchedPair]) {
    let _ = writeln!(out, "{} ({}):", heading, pairs.len());
    for p in pairs {
        let _ = writeln!(out, "  remote: {}  <->  local: {}", p.remote.location, p.local.location);
    }
}

fn item_lines(out: &mut String, heading: &str, items: &[Item]) {
    let _ = writeln!(out, "{} ({}):", heading, items.len());
    for item in items {
        let _ = writeln!(out, "  {}", item.location);
    }
}

/// Human-readable report: the four buckets, then diagnostics.
pub fn format_text_report(result: &ReconResult) -> String {
    let mut out = String::new();
    pair_lines(&mut out, "Same name, same EXIF", &result.matched_by_name);
    out.push('\n');
    pair_lines(&mut out, "Same EXIF, different name", &result.matched_by_content);
    out.push('\n');
    item_lines(&mut out, "Only in remote", &result.remote_only);
    out.push('\n');
    item_lines(&mut out, "Only in local", &result.local_only);

    if !result.shadowed.is_empty() {
        let _ = writeln!(out, "\nShadowed by a later file with the same name ({}):", result.shadowed.len());
        for s in &result.shadowed {
            let _ = writeln!(out, "  {} {} (kept {})", s.side, s.item.location, s.shadowed_by);
        }
    }
    if !result.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings ({}):", result.warnings.len());
        for w in &result.warnings {
            let _ = writeln!(out, "  {}", w);
        }
    }
    out
}

pub fn write_report_to(out: &mut dyn Write, result: &ReconResult, format: ReportFormat) -> io::Result<()> {
    match format {
        ReportFormat::Text => out.write_all(format_text_report(result).as_bytes()),
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result)?;
            out.write_all(b"\n")
        }
    }
}

/// Write to `path`, or stdout when `None`.
pub fn write_report(path: Option<&Path>, result: &ReconResult, format: ReportFormat) -> io::Result<()> {
    match path {
        Some(path) => {
            let mut buf = Vec::new();
            write_report_to(&mut buf, result, format)?;
            fs::write(path, buf)
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write_report_to(&mut lock, result, format)?;
            lock.flush()
        }
    }
}
