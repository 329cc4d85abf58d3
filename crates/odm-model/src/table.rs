#![deny(unsafe_code)]

/// A single cell of a source table. `Missing` covers empty cells and cells
/// absent because a short record was padded to the header width.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    Text(String),
    Missing,
}

impl CellValue {
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            CellValue::Missing
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            CellValue::Missing => None,
        }
    }
}

/// One variable row. Cells are positional and line up with the owning
/// table's `columns`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Row {
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Text of the cell at `position`, or `None` when the cell is missing
    /// or out of range.
    pub fn text(&self, position: usize) -> Option<&str> {
        self.cells.get(position).and_then(CellValue::as_text)
    }

    /// Text lookup through an optional column position. Mirrors the lenient
    /// per-field access the converter uses for non-critical columns: an
    /// absent column reads as a missing value.
    pub fn field(&self, position: Option<usize>) -> Option<&str> {
        position.and_then(|idx| self.text(idx))
    }
}

/// A named source table: one header row plus data rows.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }
}
