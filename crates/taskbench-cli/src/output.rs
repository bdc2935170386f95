//! Console rendering of run results.

use taskbench::{BenchReport, TableRow};

const HEADERS: [&str; 6] = ["task", "state", "ops/sec", "average", "margin", "samples"];

/// Renders `rows` as an aligned text table.
///
/// Statistics of tasks that did not complete are shown as `-`.
pub fn render_table(rows: &[TableRow]) -> String {
    let cells: Vec<[String; 6]> = rows
        .iter()
        .map(|row| {
            [
                row.name.clone(),
                row.state.to_string(),
                row.ops_per_sec.map_or_else(dash, format_ops),
                row.average_ns.map_or_else(dash, format_duration_ns),
                row.margin_pct.map_or_else(dash, |m| format!("±{m:.2}%")),
                row.samples.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(rule.join("  ").trim_end());
    out.push('\n');
    for line in &cells {
        push_line(&mut out, line, &widths);
    }
    out
}

/// One-line summary of task outcomes.
pub fn summary_line(report: &BenchReport) -> String {
    use taskbench::TaskState::{Aborted, Completed, Errored};
    format!(
        "{} tasks: {} completed, {} errored, {} aborted",
        report.tasks.len(),
        report.count(Completed),
        report.count(Errored),
        report.count(Aborted)
    )
}

// Name and state columns are left-aligned, numbers right-aligned.
fn push_line(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let mut parts = Vec::with_capacity(cells.len());
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        let pad = width.saturating_sub(cell.chars().count());
        if i < 2 {
            parts.push(format!("{cell}{}", " ".repeat(pad)));
        } else {
            parts.push(format!("{}{cell}", " ".repeat(pad)));
        }
    }
    out.push_str(parts.join("  ").trim_end());
    out.push('\n');
}

fn dash() -> String {
    "-".to_string()
}

/// Formats a rate with thousands separators and two decimals.
pub fn format_ops(hz: f64) -> String {
    let fixed = format!("{hz:.2}");
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let digits: Vec<char> = int.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    format!("{grouped}.{frac}")
}

/// Formats nanoseconds with the largest unit that keeps the value >= 1.
pub fn format_duration_ns(ns: f64) -> String {
    if ns >= 1e9 {
        format!("{:.2} s", ns / 1e9)
    } else if ns >= 1e6 {
        format!("{:.2} ms", ns / 1e6)
    } else if ns >= 1e3 {
        format!("{:.2} µs", ns / 1e3)
    } else {
        format!("{ns:.2} ns")
    }
}
