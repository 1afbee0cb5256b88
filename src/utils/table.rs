//! Plain-text tables for showing records and statistics on the terminal.

use crate::domain::model::RecordSet;
use serde_json::Value;
use std::collections::BTreeMap;

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn render(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers)];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.extend(rows.iter().map(|r| line(r)));
    out.join("\n")
}

pub fn render_records_table(set: &RecordSet) -> String {
    let rows: Vec<Vec<String>> = set
        .records
        .iter()
        .map(|r| set.columns.iter().map(|c| cell_text(r.get(c))).collect())
        .collect();
    render(&set.columns, &rows)
}

pub fn render_stats_table(stats: &BTreeMap<String, f64>, key_header: &str, value_header: &str) -> String {
    let headers = vec![key_header.to_string(), value_header.to_string()];
    let rows: Vec<Vec<String>> = stats
        .iter()
        .map(|(k, v)| vec![k.clone(), format!("{:.2}", v)])
        .collect();
    render(&headers, &rows)
}
