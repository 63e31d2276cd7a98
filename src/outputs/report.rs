//! Plain-text report for the terminal.
//!
//! ```text
//! Searching news for keywords: sebs, bão
//! Searching past 3 days
//!
//! [1] Bộ Y Tế ghi nhận ổ dịch mới
//! Ngày: 2026-10-13 12:00
//! Link: https://vnexpress.net/o-dich-moi.html
//! Tóm tắt: Cơ quan y tế địa phương đã khoanh vùng ...
//! --------------------------------------------------------------------------------
//! ```

use crate::models::{Report, ReportItem};
use itertools::Itertools;
use std::fmt::Write;
use std::io::{self, Write as _};

const DIVIDER_WIDTH: usize = 80;

/// Render the whole report. Timestamps keep the offset they were parsed in.
pub fn render(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Searching news for keywords: {}",
        report.query.iter().join(", ")
    );
    let _ = writeln!(out, "Searching past {} days", report.days);
    for item in &report.items {
        out.push('\n');
        render_item(&mut out, item);
    }
    out
}

fn render_item(out: &mut String, item: &ReportItem) {
    let _ = writeln!(out, "[{}] {}", item.index, item.title);
    let _ = writeln!(out, "Ngày: {}", item.published_at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "Link: {}", item.link);
    let _ = writeln!(out, "Tóm tắt: {}", item.snippet);
    let _ = writeln!(out, "{}", "-".repeat(DIVIDER_WIDTH));
}

/// Write the rendered report to stdout.
pub fn print_report(report: &Report) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(render(report).as_bytes())?;
    stdout.flush()
}
