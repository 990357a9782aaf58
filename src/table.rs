//! Plain-text tables for terminal reports.

use std::{borrow::Cow, fmt::Write as _};

use itertools::Itertools;

pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect_vec();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(flatten(cell).chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers.iter().copied(), &widths));
    let rule = widths.iter().map(|w| "-".repeat((*w).max(3))).collect_vec();
    let _ = writeln!(output, "{}", format_row(rule.iter().map(String::as_str), &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row.iter().map(String::as_str), &widths));
    }
    output
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", flatten(cell), width = *width))
        .join("  ");
    line.trim_end().to_string()
}

fn flatten(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
