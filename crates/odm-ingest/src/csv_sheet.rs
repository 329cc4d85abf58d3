use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;

use odm_model::{CellValue, Row, Table};

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

fn normalize_cell(raw: &str) -> CellValue {
    CellValue::from_raw(raw.trim().trim_matches('\u{feff}'))
}

/// Read one CSV file as a named [`Table`].
///
/// The first non-empty record is the header row; data records are padded or
/// truncated to the header width so every row is positional against the
/// same columns.
pub fn read_csv_sheet(path: &Path, name: &str) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("read csv: {}", path.display()))?;

    let mut table: Option<Table> = None;
    for record in reader.records() {
        let record = record.with_context(|| format!("read record: {}", path.display()))?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        match table.as_mut() {
            None => {
                let columns: Vec<String> = record.iter().map(normalize_header).collect();
                table = Some(Table::new(name, columns));
            }
            Some(table) => {
                let width = table.columns.len();
                let mut cells = Vec::with_capacity(width);
                for idx in 0..width {
                    cells.push(normalize_cell(record.get(idx).unwrap_or("")));
                }
                table.push_row(Row::new(cells));
            }
        }
    }
    Ok(table.unwrap_or_else(|| Table::new(name, Vec::new())))
}
