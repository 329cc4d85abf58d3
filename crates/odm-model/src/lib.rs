//! Shared data model for the dictionary-to-ODM converter.
//!
//! A source workbook is a set of positional string [`Table`]s: one primary
//! variable dictionary plus zero or more missing-value sheets. Column
//! resolution goes through [`ColumnIndex`] and its [`Field`] alias table.

pub mod columns;
pub mod error;
pub mod table;

pub use columns::{ColumnIndex, Field};
pub use error::{OdmError, Result};
pub use table::{CellValue, Row, Table};

/// Sentinel code used when a value-label cell holds a bare description with
/// no `code=` prefix (legacy data).
pub const LABEL_ONLY_CODE: &str = "-999999";

/// Placeholder text emitted where the source provides no label in either
/// language. Matches the historical converter output.
pub const NULL_MARKER: &str = "None";

/// Segment name used when a derivation produces an empty string.
pub const PLACEHOLDER_SEGMENT: &str = "UNGROUPED";
