#![forbid(unsafe_code)]

//! Human-readable and JSON renditions of an audit report.

use reconcile::AuditReport;
use reconcile::domain::{ClassificationResult, size_display};
use reconcile::flatten::{FlattenCandidate, FlattenReason};
use std::io::{self, Write};
use std::path::Path;

const HEADERS: [&str; 8] = ["ID", "TYPE", "NAME", "STATUS", "SIZE", "FORMAT", "BASE", "NOTES"];
const GAP: &str = "  ";

type Row = [String; HEADERS.len()];

fn row(result: &ClassificationResult) -> Row {
    [
        result.id.to_string(),
        result.type_code.code().to_owned(),
        result.name.clone(),
        result.status.as_str().to_owned(),
        result.size_display.clone(),
        result.format.clone().unwrap_or_else(|| "-".to_owned()),
        result.base_display.clone(),
        result.notes_display(),
    ]
}

/// Write rows left-aligned under their headers. Widths count characters, so
/// elided bases line up.
fn write_table(out: &mut impl Write, rows: &[Row]) -> io::Result<()> {
    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Row = HEADERS.map(str::to_owned);
    for row in std::iter::once(&header).chain(rows) {
        let cells: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        writeln!(out, "{}", cells.join(GAP).trim_end())?;
    }
    Ok(())
}

fn reason(reason: FlattenReason) -> &'static str {
    match reason {
        FlattenReason::BaseUnknown => "base unknown to the control plane",
        FlattenReason::BothUnknown => "snapshot and base unknown to the control plane",
    }
}

/// Quote a path for a POSIX shell.
fn shell_quote(path: &Path) -> String {
    let path = path.to_string_lossy();
    let safe = |c: char| c.is_ascii_alphanumeric() || "/._-+:=@".contains(c);
    if !path.is_empty() && path.chars().all(safe) {
        path.into_owned()
    } else {
        format!("'{}'", path.replace('\'', r"'\''"))
    }
}

/// The command that would turn a snapshot into a standalone image. Printed
/// for an operator to review, never run.
pub fn flatten_command(candidate: &FlattenCandidate) -> String {
    format!(
        "qemu-img convert -p -O qcow2 {} {}",
        shell_quote(&candidate.source),
        shell_quote(&candidate.target)
    )
}

/// Render the report as an aligned table followed by a summary, warnings
/// about unavailable fact sources and flatten hints.
pub fn write_text(out: &mut impl Write, report: &AuditReport, show_foreign: bool) -> io::Result<()> {
    writeln!(out, "Directory: {}", report.directory.display())?;
    writeln!(out, "Pool:      {}", report.pool)?;
    writeln!(out)?;

    if report.results.is_empty() {
        writeln!(out, "No image files found.")?;
    } else {
        let rows: Vec<Row> = report.results.iter().map(row).collect();
        write_table(out, &rows)?;
    }

    let summary = &report.summary;
    writeln!(out)?;
    writeln!(
        out,
        "Summary: {} files, {} images, {} foreign, {} flatten candidates",
        summary.files_scanned, summary.well_formed, summary.foreign, summary.flatten_candidates
    )?;
    if !summary.by_type.is_empty() {
        let types: Vec<String> = summary
            .by_type
            .iter()
            .map(|(type_code, count)| format!("{}={count}", type_code.code()))
            .collect();
        writeln!(out, "Types:   {}", types.join(" "))?;
    }
    if summary.uninspected > 0 {
        writeln!(out, "{} files could not be inspected", summary.uninspected)?;
    }

    if show_foreign && !report.foreign.is_empty() {
        writeln!(out)?;
        writeln!(out, "Foreign files:")?;
        for file in &report.foreign {
            writeln!(out, "  {} ({})", file.file_name, size_display(Some(file.len)))?;
        }
    }

    if report.is_degraded() {
        writeln!(out)?;
        for degraded in &report.degraded {
            writeln!(out, "warning: {} unavailable: {}", degraded.source, degraded.reason)?;
        }
        writeln!(out, "warning: classification used partial facts")?;
    }

    if !report.flatten.is_empty() {
        writeln!(out)?;
        writeln!(out, "Flatten candidates (review before running):")?;
        for candidate in report.flatten.candidates() {
            writeln!(out, "  # {}: {}", candidate.snapshot, reason(candidate.reason))?;
            writeln!(out, "  {}", flatten_command(candidate))?;
        }
    }
    Ok(())
}

pub fn write_json(out: impl Write, report: &AuditReport) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(out, report)
}

/// Hide the password of a database URL.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_owned();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split_once(':').map_or(credentials, |(user, _)| user);
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_owned(),
    }
}
