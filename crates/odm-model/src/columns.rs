//! Header-row column resolution.
//!
//! The source dictionaries have gone through several revisions and a few
//! logical fields carry more than one historical spelling. All lookups go
//! through one alias table here instead of per-call-site fallback chains.

use std::collections::BTreeMap;

use crate::error::{OdmError, Result};

/// Logical fields the converter reads from the primary dictionary sheet and
/// from missing-value sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    VarNames,
    Hierarchy,
    Dce,
    StudySegment,
    ValueLabels,
    ValueLabelsDe,
    MissingListTable,
    DataType,
    Label,
    LabelDe,
    LongLabel,
    LongLabelDe,
    Note,
    NoteDe,
    CodeValue,
    CodeLabel,
}

impl Field {
    /// Accepted column spellings, in resolution order.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::VarNames => &["VARNAMES", "VAR_NAMES"],
            Field::Hierarchy => &["HIERARCHY"],
            Field::Dce => &["DCE"],
            Field::StudySegment => &["STUDY_SEGMENT"],
            Field::ValueLabels => &["VALUE_LABELS"],
            Field::ValueLabelsDe => &["VALUE_LABELS_DE"],
            Field::MissingListTable => &["MISSING_LIST_TABLE"],
            Field::DataType => &["DATA_TYPE"],
            Field::Label => &["LABEL"],
            Field::LabelDe => &["LABEL_DE"],
            Field::LongLabel => &["LONG_LABEL"],
            Field::LongLabelDe => &["LONG_LABEL_DE"],
            Field::Note => &["NOTE"],
            Field::NoteDe => &["NOTE_DE"],
            Field::CodeValue => &["CODE_VALUE"],
            Field::CodeLabel => &["CODE_LABEL"],
        }
    }
}

/// Immutable name-to-position mapping for one table's header row, built once
/// per table and passed into every pipeline stage.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: BTreeMap<String, usize>,
}

impl ColumnIndex {
    pub fn new(columns: &[String]) -> Self {
        let mut positions = BTreeMap::new();
        for (position, name) in columns.iter().enumerate() {
            // First occurrence wins when a header repeats.
            positions.entry(name.clone()).or_insert(position);
        }
        Self { positions }
    }

    /// Position of an exact column name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Position of a logical field, consulting its alias table.
    pub fn field(&self, field: Field) -> Option<usize> {
        field
            .aliases()
            .iter()
            .find_map(|alias| self.position(alias))
    }

    /// Like [`ColumnIndex::field`] but an absent column is an error. Used
    /// for the fields grouping cannot proceed without.
    pub fn require(&self, field: Field) -> Result<usize> {
        self.field(field)
            .ok_or_else(|| OdmError::MissingColumn(field.aliases()[0].to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(names: &[&str]) -> ColumnIndex {
        let columns: Vec<String> = names.iter().map(|name| (*name).to_string()).collect();
        ColumnIndex::new(&columns)
    }

    #[test]
    fn resolves_varnames_through_both_spellings() {
        let modern = index(&["HIERARCHY", "VARNAMES"]);
        assert_eq!(modern.field(Field::VarNames), Some(1));

        let legacy = index(&["VAR_NAMES", "HIERARCHY"]);
        assert_eq!(legacy.field(Field::VarNames), Some(0));
    }

    #[test]
    fn primary_spelling_wins_over_alias() {
        let both = index(&["VAR_NAMES", "VARNAMES"]);
        assert_eq!(both.field(Field::VarNames), Some(1));
    }

    #[test]
    fn absent_field_is_none_not_zero() {
        let idx = index(&["HIERARCHY", "LABEL"]);
        assert_eq!(idx.field(Field::VarNames), None);
        assert!(idx.require(Field::VarNames).is_err());
    }

    #[test]
    fn first_duplicate_header_wins() {
        let idx = index(&["LABEL", "LABEL"]);
        assert_eq!(idx.position("LABEL"), Some(0));
    }
}
