pub mod notice;

use colored::Colorize;
use itertools::Itertools;
use serde::Serialize;

use crate::api::Resource;
use crate::model::Record;
use crate::pagination::{PageControl, PaginationState};

pub use notice::{Notice, NoticeKind};

pub const MAX_CELL_WIDTH: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" | "table" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn truncate_cell(value: &str) -> String {
    let flat = value.replace(['\n', '\r', '\t'], " ");
    if flat.chars().count() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut out: String = flat.chars().take(MAX_CELL_WIDTH - 1).collect();
    out.push('…');
    out
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{}{}", value, " ".repeat(width.saturating_sub(len)))
}

/// Render records as an aligned text table using the resource's columns.
pub fn render_table(resource: Resource, records: &[Record]) -> String {
    let columns = resource.columns();
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| columns.iter().map(|c| truncate_cell(&r.cell(c.key))).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render_row = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, w)| pad(cell, *w))
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&render_row(columns.iter().map(|c| c.header).collect()));
    out.push('\n');
    let rule_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&"-".repeat(rule_width));
    out.push('\n');
    if rows.is_empty() {
        out.push_str("(no records)\n");
        return out;
    }
    for row in rows.iter() {
        out.push_str(&render_row(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

/// Render one record as `label: value` lines, known columns first.
pub fn render_record(resource: Resource, record: &Record) -> String {
    let columns = resource.columns();
    let mut lines: Vec<(String, String)> = columns
        .iter()
        .filter(|c| record.0.contains_key(c.key))
        .map(|c| (c.header.to_string(), record.cell(c.key)))
        .collect();
    for key in record.0.keys() {
        if columns.iter().any(|c| c.key == key) {
            continue;
        }
        lines.push((key.clone(), record.cell(key)));
    }
    let width = lines.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    lines
        .into_iter()
        .map(|(k, v)| format!("{}: {}\n", pad(&k, width), v))
        .collect()
}

/// Render the pagination bar, e.g. `‹ Prev  1 2 … 4 [5] 6 … 9 10  Next ›`.
pub fn render_pagination_bar(state: &PaginationState, color: bool) -> String {
    let current = state.current_page();
    let pages = state
        .controls()
        .into_iter()
        .map(|control| match control {
            PageControl::Number(page) if page == current => {
                let label = format!("[{page}]");
                if color {
                    label.bold().cyan().to_string()
                } else {
                    label
                }
            }
            PageControl::Number(page) => page.to_string(),
            PageControl::Ellipsis => "…".to_string(),
        })
        .join(" ");

    let edge = |label: &str, enabled: bool| {
        if color && !enabled {
            label.dimmed().to_string()
        } else if color {
            label.bold().to_string()
        } else {
            label.to_string()
        }
    };

    format!(
        "{}  {}  {}",
        edge("‹ Prev", state.has_previous()),
        pages,
        edge("Next ›", state.has_next())
    )
}

#[derive(Serialize)]
struct ListOutput<'a> {
    resource: &'a str,
    page: usize,
    pages: usize,
    result: &'a [Record],
}

pub fn render_list_json(resource: Resource, state: &PaginationState, records: &[Record]) -> Vec<u8> {
    let out = ListOutput {
        resource: resource.name(),
        page: state.current_page(),
        pages: state.total_pages(),
        result: records,
    };
    serde_json::to_vec_pretty(&out).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render_record_json(record: &Record) -> Vec<u8> {
    serde_json::to_vec_pretty(record).unwrap_or_else(|_| b"{}\n".to_vec())
}
