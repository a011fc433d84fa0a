// src/report.rs
// =============================================================================
// This module turns check results into something a human (or a script) can
// read: a terminal table, JSON, or CSV.
//
// Key functionality:
// - Status groups (2xx, 3xx, 4xx, 5xx, Other, Error) for every row
// - Filtering down to failures, sorting by a chosen column
// - A summary with counts per group, soft 404s and average response time
//
// Results themselves are never modified here; presentation-only fields live
// in ReportRow, which wraps a CheckResult.
//
// Rust concepts:
// - #[serde(flatten)]: Embed one struct's fields into another when serializing
// - impl Write: Write to stdout, a file, or a Vec<u8> in tests
// - sort_by with Ordering: Custom sort orders
// =============================================================================

use crate::checker::CheckResult;
use crate::cli::{OutputFormat, SortKey};
use anyhow::{Context, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;

/// Coarse bucket for a final status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatusGroup {
    #[serde(rename = "2xx")]
    Success,
    #[serde(rename = "3xx")]
    Redirect,
    #[serde(rename = "4xx")]
    ClientError,
    #[serde(rename = "5xx")]
    ServerError,
    Other,
    Error,
}

impl StatusGroup {
    /// All groups, in the order the summary lists them.
    pub const ALL: [StatusGroup; 6] = [
        StatusGroup::Success,
        StatusGroup::Redirect,
        StatusGroup::ClientError,
        StatusGroup::ServerError,
        StatusGroup::Other,
        StatusGroup::Error,
    ];

    // Numeric statuses are grouped by their first digit; anything that
    // isn't a number is an error label
    pub fn of(final_status_code: &str) -> StatusGroup {
        match final_status_code.parse::<u16>() {
            Ok(code) => match code / 100 {
                2 => StatusGroup::Success,
                3 => StatusGroup::Redirect,
                4 => StatusGroup::ClientError,
                5 => StatusGroup::ServerError,
                _ => StatusGroup::Other,
            },
            Err(_) => StatusGroup::Error,
        }
    }
}

impl fmt::Display for StatusGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusGroup::Success => "2xx",
            StatusGroup::Redirect => "3xx",
            StatusGroup::ClientError => "4xx",
            StatusGroup::ServerError => "5xx",
            StatusGroup::Other => "Other",
            StatusGroup::Error => "Error",
        };
        f.write_str(name)
    }
}

/// One row of the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    #[serde(flatten)]
    pub result: CheckResult,
    pub status_group: StatusGroup,
}

impl ReportRow {
    pub fn new(result: CheckResult) -> Self {
        let status_group = StatusGroup::of(&result.final_status_code);
        Self { result, status_group }
    }

    /// 4xx, 5xx, transport errors and soft 404s count as failures.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.status_group,
            StatusGroup::ClientError | StatusGroup::ServerError | StatusGroup::Error
        ) || self.result.soft_404
    }
}

// Builds rows in the order the URLs were given
//
// Parameters:
//   results: check results, in completion order
//   urls: the resolved URL list, in sitemap order
// Returns: one row per result, sorted by the URL's position in `urls`
pub fn rows_in_input_order(results: Vec<CheckResult>, urls: &[String]) -> Vec<ReportRow> {
    let position: HashMap<&str, usize> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| (url.as_str(), i))
        .collect();

    let mut rows: Vec<ReportRow> = results.into_iter().map(ReportRow::new).collect();
    rows.sort_by_key(|row| {
        position
            .get(row.result.input_url.as_str())
            .copied()
            .unwrap_or(usize::MAX)
    });
    rows
}

pub fn failures_only(rows: Vec<ReportRow>) -> Vec<ReportRow> {
    rows.into_iter().filter(ReportRow::is_failure).collect()
}

// Sorts rows in place. The sort is stable, so rows that compare equal keep
// their sitemap order.
pub fn sort_rows(rows: &mut [ReportRow], key: SortKey, descending: bool) {
    let compare: fn(&ReportRow, &ReportRow) -> Ordering = match key {
        SortKey::Original => |_, _| Ordering::Equal,
        SortKey::Status => |a, b| compare_status(&a.result.final_status_code, &b.result.final_status_code),
        SortKey::Time => |a, b| a.result.response_time_ms.total_cmp(&b.result.response_time_ms),
        SortKey::Redirects => |a, b| a.result.redirect_count.cmp(&b.result.redirect_count),
    };

    if descending {
        rows.sort_by(|a, b| compare(b, a));
        if key == SortKey::Original {
            rows.reverse();
        }
    } else {
        rows.sort_by(compare);
    }
}

// Numeric statuses first (ascending), then error labels alphabetically
fn compare_status(a: &str, b: &str) -> Ordering {
    match (a.parse::<u16>(), b.parse::<u16>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Totals shown under the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_group: Vec<(String, usize)>,
    /// Started with a 3xx and ended on a 200
    pub redirecting: usize,
    pub soft_404: usize,
    /// Error label -> count, most frequent first
    pub errors_by_label: Vec<(String, usize)>,
    pub failures: usize,
    pub average_response_ms: f64,
}

impl Summary {
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let by_group = StatusGroup::ALL
            .iter()
            .map(|group| {
                let count = rows.iter().filter(|r| r.status_group == *group).count();
                (group.to_string(), count)
            })
            .collect();

        let redirecting = rows
            .iter()
            .filter(|r| r.result.first_status_code.starts_with('3') && r.result.final_status_code == "200")
            .count();

        let mut label_counts: HashMap<&str, usize> = HashMap::new();
        for row in rows.iter().filter(|r| r.result.is_error()) {
            *label_counts.entry(row.result.error.as_str()).or_default() += 1;
        }
        let mut errors_by_label: Vec<(String, usize)> = label_counts
            .into_iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect();
        errors_by_label.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let average_response_ms = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|r| r.result.response_time_ms).sum::<f64>() / rows.len() as f64
        };

        Self {
            total: rows.len(),
            by_group,
            redirecting,
            soft_404: rows.iter().filter(|r| r.result.soft_404).count(),
            errors_by_label,
            failures: rows.iter().filter(|r| r.is_failure()).count(),
            average_response_ms,
        }
    }
}

// Writes the rows in the requested format
pub fn write_report<W: Write>(writer: &mut W, rows: &[ReportRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(writer, rows),
        OutputFormat::Json => write_json(writer, rows),
        OutputFormat::Csv => write_csv(writer, rows),
    }
}

pub fn write_json<W: Write>(writer: &mut W, rows: &[ReportRow]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, rows).context("Failed to serialize report as JSON")?;
    writeln!(writer)?;
    Ok(())
}

const CSV_HEADER: [&str; 14] = [
    "input_url",
    "status_group",
    "first_status_code",
    "final_status_code",
    "final_url",
    "response_time_ms",
    "redirect_count",
    "redirect_chain",
    "method_used",
    "user_agent_used",
    "soft_404",
    "error",
    "alt_status_code",
    "alt_user_agent_used",
];

// The csv crate can't serialize #[serde(flatten)] structs, so the columns
// are written out explicitly
pub fn write_csv<W: Write>(writer: &mut W, rows: &[ReportRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;

    for row in rows {
        let r = &row.result;
        csv_writer.write_record([
            r.input_url.clone(),
            row.status_group.to_string(),
            r.first_status_code.clone(),
            r.final_status_code.clone(),
            r.final_url.clone(),
            format!("{:.1}", r.response_time_ms),
            r.redirect_count.to_string(),
            r.redirect_chain.clone(),
            r.method_used.clone(),
            r.user_agent_used.clone(),
            r.soft_404.to_string(),
            r.error.clone(),
            r.alt_status_code.clone(),
            r.alt_user_agent_used.clone(),
        ])?;
    }

    csv_writer.flush().context("Failed to write CSV report")?;
    Ok(())
}

// Prints a human-readable table followed by the summary
pub fn write_table<W: Write>(writer: &mut W, rows: &[ReportRow]) -> Result<()> {
    writeln!(
        writer,
        "{:<60} {:<16} {:<6} {:>10} {:>5} {:<6} {:<20}",
        "URL", "STATUS", "GROUP", "TIME (ms)", "HOPS", "METHOD", "NOTE"
    )?;
    writeln!(writer, "{}", "=".repeat(129))?;

    for row in rows {
        let r = &row.result;
        let url_display = truncate(&r.input_url, 57);
        writeln!(
            writer,
            "{:<60} {:<16} {:<6} {:>10.1} {:>5} {:<6} {:<20}",
            url_display,
            r.final_status_code,
            row.status_group.to_string(),
            r.response_time_ms,
            r.redirect_count,
            r.method_used,
            note(r)
        )?;
    }

    writeln!(writer)?;
    write_summary(writer, &Summary::from_rows(rows))
}

pub fn write_summary<W: Write>(writer: &mut W, summary: &Summary) -> Result<()> {
    writeln!(writer, "📊 Summary:")?;
    for (group, count) in &summary.by_group {
        if *count > 0 {
            writeln!(writer, "   {:<6} {}", group, count)?;
        }
    }
    writeln!(writer, "   🔀 Redirecting: {}", summary.redirecting)?;
    writeln!(writer, "   🕳️  Soft 404: {}", summary.soft_404)?;
    if !summary.errors_by_label.is_empty() {
        writeln!(writer, "   ⚠️  Errors:")?;
        for (label, count) in &summary.errors_by_label {
            writeln!(writer, "      {:<16} {}", label, count)?;
        }
    }
    writeln!(writer, "   ❌ Failures: {}", summary.failures)?;
    writeln!(writer, "   ⏱️  Average response: {:.1} ms", summary.average_response_ms)?;
    writeln!(writer, "   📋 Total: {}", summary.total)?;
    Ok(())
}

// Short free-text hint for the table's last column
fn note(result: &CheckResult) -> String {
    if result.soft_404 {
        "soft 404".to_string()
    } else if !result.alt_status_code.is_empty() {
        format!("alt: {} ({})", result.alt_status_code, result.alt_user_agent_used)
    } else if result.redirect_count > 0 {
        result.redirect_chain.clone()
    } else {
        String::new()
    }
}

// Cuts on a char boundary so multi-byte URLs don't panic
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
