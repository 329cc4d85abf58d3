//! Workbook discovery.
//!
//! The converter consumes one primary variable dictionary plus any number of
//! missing-value sheets. On disk that is a primary CSV file whose sibling
//! `*.csv` files are treated as the auxiliary sheets, keyed by file stem —
//! the same name the dictionary's `MISSING_LIST_TABLE` column refers to.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use odm_model::Table;

use crate::csv_sheet::read_csv_sheet;

/// A loaded source workbook: the primary dictionary sheet and the auxiliary
/// missing-value sheets, keyed by sheet name.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Base name of the primary file, without extension. Used for study and
    /// output-file naming.
    pub name: String,
    pub primary: Table,
    pub sheets: BTreeMap<String, Table>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.get(name)
    }
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("cannot derive a sheet name from {}", path.display()))
}

/// Load the primary sheet at `path` and every sibling CSV as an auxiliary
/// sheet. Sheet discovery is deterministic (sorted by name).
pub fn load_workbook(path: &Path) -> Result<Workbook> {
    let name = file_stem(path)?;
    let primary =
        read_csv_sheet(path, &name).with_context(|| format!("primary sheet {}", path.display()))?;

    let mut sheets = BTreeMap::new();
    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = dir {
        let mut candidates: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("list workbook directory {}", dir.display()))?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|candidate| {
                candidate.is_file()
                    && candidate != path
                    && candidate
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();
        candidates.sort();
        for candidate in candidates {
            let sheet_name = file_stem(&candidate)?;
            let table = read_csv_sheet(&candidate, &sheet_name)
                .with_context(|| format!("auxiliary sheet {}", candidate.display()))?;
            sheets.insert(sheet_name, table);
        }
    }
    debug!(
        workbook = %name,
        rows = primary.rows.len(),
        sheets = sheets.len(),
        "workbook loaded"
    );
    Ok(Workbook {
        name,
        primary,
        sheets,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn loads_primary_and_sibling_sheets() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("study.csv"),
            "VARNAMES,HIERARCHY\nv001,A|B\n",
        )
        .expect("write primary");
        fs::write(
            dir.path().join("MISSING_LIST_3.csv"),
            "CODE_VALUE,CODE_LABEL\n99,unknown\n",
        )
        .expect("write sheet");

        let workbook = load_workbook(&dir.path().join("study.csv")).expect("load workbook");
        assert_eq!(workbook.name, "study");
        assert_eq!(workbook.primary.rows.len(), 1);
        assert_eq!(workbook.sheets.len(), 1);
        let sheet = workbook.sheet("MISSING_LIST_3").expect("sheet present");
        assert_eq!(sheet.rows[0].text(0), Some("99"));
        assert!(workbook.sheet("OTHER").is_none());
    }

    #[test]
    fn missing_primary_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_workbook(&dir.path().join("absent.csv")).is_err());
    }
}
