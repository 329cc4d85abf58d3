//! Combo-key resolution and union code-list building.
//!
//! The consuming EDC system requires every item definition to appear before
//! any code-list definition in a document. References are therefore resolved
//! in a first pass over an event's rows (variable → emitted OID plus the set
//! of distinct combo keys), and the unioned lists themselves are built in a
//! second pass over those keys, without re-reading the source rows.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use sha2::{Digest, Sha256};

use odm_model::{ColumnIndex, Field, NULL_MARKER, Result, Row, Table};

use crate::grouping::SegmentBuckets;
use crate::registry::{CodeList, CodeListRegistry, datatype_of};

/// Identity of one emitted code list: a base list plus an optional
/// missing-value sheet whose codes are unioned into it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ComboKey {
    pub base: u32,
    pub sheet: Option<String>,
}

/// Deterministic OID for a combo key. The sheetless form is the plain base
/// identifier; with a sheet the identifier carries a content-hash suffix so
/// the same (base, sheet) pair maps to the same OID on every run, while
/// differing sheets over one base stay distinct.
pub fn stable_combo_oid(base: u32, sheet: Option<&str>) -> String {
    match sheet {
        None => format!("CL.{base}"),
        Some(sheet) => {
            let digest = Sha256::digest(format!("{base}|{sheet}").as_bytes());
            let hash = hex::encode(digest);
            format!("CL.{base}.M{}", &hash[..12])
        }
    }
}

/// Phase-1 output for one event: which OID each variable references, and
/// which unioned lists the event actually needs.
#[derive(Debug, Default)]
pub struct ResolvedReferences {
    pub by_variable: BTreeMap<String, String>,
    pub combos: BTreeSet<ComboKey>,
}

/// Resolve code-list references for every row of one event. Variables with
/// no registered base list stay unresolved and get no reference.
pub fn resolve_references(
    segments: &SegmentBuckets,
    index: &ColumnIndex,
    registry: &CodeListRegistry,
) -> Result<ResolvedReferences> {
    let var_col = index.require(Field::VarNames)?;
    let missing_col = index.field(Field::MissingListTable);

    let mut resolved = ResolvedReferences::default();
    for rows in segments.values() {
        for row in rows {
            let Some(variable) = row.text(var_col) else {
                continue;
            };
            let Some(base) = registry.find_by_variable(variable) else {
                continue;
            };
            let sheet = row.field(missing_col).map(str::to_string);
            let oid = stable_combo_oid(base.number, sheet.as_deref());
            resolved.by_variable.insert(variable.to_string(), oid);
            resolved.combos.insert(ComboKey {
                base: base.number,
                sheet,
            });
        }
    }
    Ok(resolved)
}

/// One entry of a unioned code list.
#[derive(Debug, Clone)]
pub struct UnionItem {
    pub code: String,
    pub label_de: Option<String>,
    pub label_en: Option<String>,
    /// (Context, Name) alias pairs for traceability.
    pub aliases: Vec<(String, String)>,
}

/// A fully built, emission-ready code list: base entries plus the deduplicated
/// codes of an optional missing-value sheet.
#[derive(Debug, Clone)]
pub struct UnionCodeList {
    pub oid: String,
    pub datatype: &'static str,
    pub items: Vec<UnionItem>,
}

/// Phase 2: build the unioned list for one combo key.
///
/// Base entries come from the German map (with the English translation
/// attached where the same code exists), or from English alone when no
/// German entries exist. Missing-sheet rows append codes not already in use;
/// duplicates, including duplicates within the sheet itself, are silently
/// dropped (first occurrence wins). Any non-integer sheet code promotes the
/// list's datatype to `"string"`; it is never demoted back.
pub fn build_union_codelist(
    base: &CodeList,
    sheet_name: Option<&str>,
    sheet: Option<&Table>,
) -> UnionCodeList {
    let oid = stable_combo_oid(base.number, sheet_name);
    let mut datatype = datatype_of(base);
    let mut items = Vec::new();
    let mut used: HashSet<&str> = HashSet::new();

    if base.de.is_empty() {
        for (code, label) in &base.en {
            used.insert(code);
            items.push(UnionItem {
                code: code.clone(),
                label_de: None,
                label_en: Some(label.clone()),
                aliases: Vec::new(),
            });
        }
    } else {
        for (code, label) in &base.de {
            used.insert(code);
            items.push(UnionItem {
                code: code.clone(),
                label_de: Some(label.clone()),
                label_en: base.en.get(code).cloned(),
                aliases: Vec::new(),
            });
        }
    }

    if let (Some(sheet_name), Some(sheet)) = (sheet_name, sheet) {
        let sheet_index = ColumnIndex::new(&sheet.columns);
        let code_col = sheet_index.field(Field::CodeValue);
        let label_col = sheet_index.field(Field::CodeLabel);
        for row in &sheet.rows {
            let Some(code) = row.field(code_col) else {
                continue;
            };
            if !used.insert(code) {
                continue;
            }
            if code.parse::<i64>().is_err() {
                datatype = "string";
            }
            let label = row.field(label_col).unwrap_or(NULL_MARKER);
            let mut aliases: Vec<(String, String)> = sheet
                .columns
                .iter()
                .enumerate()
                .filter_map(|(position, column)| {
                    row.text(position)
                        .map(|value| (column.clone(), value.to_string()))
                })
                .collect();
            aliases.push(("ORIGIN_CODELIST".to_string(), sheet_name.to_string()));
            items.push(UnionItem {
                code: code.to_string(),
                label_de: None,
                label_en: Some(label.to_string()),
                aliases,
            });
        }
    }

    UnionCodeList {
        oid,
        datatype,
        items,
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use odm_model::CellValue;

    use super::*;
    use crate::value_labels::parse_value_labels;

    fn base_list(number: u32, en: &str, de: &str) -> CodeList {
        let parse = |raw: &str| {
            if raw.is_empty() {
                IndexMap::new()
            } else {
                parse_value_labels(Some(raw))
            }
        };
        CodeList {
            number,
            names: vec!["v001".to_string()],
            en: parse(en),
            de: parse(de),
        }
    }

    fn sheet(name: &str, columns: &[&str], rows: &[&[Option<&str>]]) -> Table {
        let mut table = Table::new(name, columns.iter().map(|c| (*c).to_string()).collect());
        for cells in rows {
            table.push_row(Row::new(
                cells
                    .iter()
                    .map(|cell| match cell {
                        Some(text) => CellValue::Text((*text).to_string()),
                        None => CellValue::Missing,
                    })
                    .collect(),
            ));
        }
        table
    }

    #[test]
    fn combo_oid_is_deterministic_and_distinct() {
        let with_sheet = stable_combo_oid(7, Some("SHEET_A"));
        assert_eq!(with_sheet, stable_combo_oid(7, Some("SHEET_A")));
        assert_ne!(with_sheet, stable_combo_oid(7, None));
        assert_ne!(with_sheet, stable_combo_oid(7, Some("SHEET_B")));
        assert_ne!(with_sheet, stable_combo_oid(8, Some("SHEET_A")));
        assert_eq!(stable_combo_oid(7, None), "CL.7");
    }

    #[test]
    fn union_drops_duplicate_sheet_codes() {
        let base = base_list(3, "", "1=Ja|2=Nein");
        let table = sheet(
            "ML_1",
            &["CODE_VALUE", "CODE_LABEL"],
            &[&[Some("3"), Some("Fehlend")], &[Some("1"), Some("dup")]],
        );
        let union = build_union_codelist(&base, Some("ML_1"), Some(&table));

        let codes: Vec<&str> = union.items.iter().map(|item| item.code.as_str()).collect();
        assert_eq!(codes, vec!["1", "2", "3"]);
        assert_eq!(union.datatype, "integer");
        let appended = &union.items[2];
        assert_eq!(appended.label_en.as_deref(), Some("Fehlend"));
        assert!(
            appended
                .aliases
                .contains(&("ORIGIN_CODELIST".to_string(), "ML_1".to_string()))
        );
    }

    #[test]
    fn union_dedupes_within_the_sheet_itself() {
        let base = base_list(3, "", "1=Ja");
        let table = sheet(
            "ML_1",
            &["CODE_VALUE", "CODE_LABEL"],
            &[&[Some("9"), Some("first")], &[Some("9"), Some("second")]],
        );
        let union = build_union_codelist(&base, Some("ML_1"), Some(&table));
        assert_eq!(union.items.len(), 2);
        assert_eq!(union.items[1].label_en.as_deref(), Some("first"));
    }

    #[test]
    fn non_integer_sheet_code_promotes_datatype() {
        let base = base_list(4, "", "1=Ja|2=Nein");
        let table = sheet("ML_2", &["CODE_VALUE", "CODE_LABEL"], &[&[
            Some("X1"),
            Some("invalid"),
        ]]);
        let union = build_union_codelist(&base, Some("ML_2"), Some(&table));
        assert_eq!(union.datatype, "string");
    }

    #[test]
    fn sheet_rows_without_code_are_skipped_and_labels_default() {
        let base = base_list(5, "1=yes", "");
        let table = sheet(
            "ML_3",
            &["CODE_VALUE", "CODE_LABEL", "CODE_CLASS"],
            &[
                &[None, Some("ignored"), None],
                &[Some("7"), None, Some("MISSING")],
            ],
        );
        let union = build_union_codelist(&base, Some("ML_3"), Some(&table));
        assert_eq!(union.items.len(), 2);
        let appended = &union.items[1];
        assert_eq!(appended.label_en.as_deref(), Some(NULL_MARKER));
        assert!(
            appended
                .aliases
                .contains(&("CODE_CLASS".to_string(), "MISSING".to_string()))
        );
    }

    #[test]
    fn english_only_base_populates_from_english() {
        let base = base_list(6, "1=yes|2=no", "");
        let union = build_union_codelist(&base, None, None);
        assert_eq!(union.items.len(), 2);
        assert_eq!(union.items[0].label_en.as_deref(), Some("yes"));
        assert_eq!(union.items[0].label_de, None);
        assert_eq!(union.oid, "CL.6");
    }

    #[test]
    fn german_base_attaches_english_translations() {
        let base = base_list(7, "1=yes", "1=Ja|2=Nein");
        let union = build_union_codelist(&base, None, None);
        assert_eq!(union.items[0].label_de.as_deref(), Some("Ja"));
        assert_eq!(union.items[0].label_en.as_deref(), Some("yes"));
        assert_eq!(union.items[1].label_en, None);
    }

    #[test]
    fn referenced_sheet_missing_from_workbook_keeps_base_only() {
        let base = base_list(8, "", "1=Ja");
        let union = build_union_codelist(&base, Some("GONE"), None);
        assert_eq!(union.items.len(), 1);
        // The OID still encodes the sheet reference.
        assert_ne!(union.oid, "CL.8");
    }

    #[test]
    fn resolve_references_collects_distinct_combos() {
        let mut registry = CodeListRegistry::new();
        registry.register("v1", parse_value_labels(Some("1=a")), IndexMap::new());
        registry.register("v2", parse_value_labels(Some("1=a")), IndexMap::new());
        registry.register("v3", parse_value_labels(Some("2=b")), IndexMap::new());

        let columns = vec![
            "VARNAMES".to_string(),
            "MISSING_LIST_TABLE".to_string(),
        ];
        let index = ColumnIndex::new(&columns);
        let make_row = |var: &str, sheet: Option<&str>| {
            Row::new(vec![
                CellValue::Text(var.to_string()),
                match sheet {
                    Some(name) => CellValue::Text(name.to_string()),
                    None => CellValue::Missing,
                },
            ])
        };
        let mut segments = SegmentBuckets::new();
        segments.insert("form".to_string(), vec![
            make_row("v1", Some("ML_1")),
            make_row("v2", None),
            make_row("v3", Some("ML_1")),
            make_row("unknown", None),
        ]);

        let resolved = resolve_references(&segments, &index, &registry).expect("resolve");
        assert_eq!(resolved.by_variable.len(), 3);
        assert!(!resolved.by_variable.contains_key("unknown"));
        // v1 and v2 share base 1 but differ in sheet, so three combos total.
        assert_eq!(resolved.combos.len(), 3);
        assert_eq!(
            resolved.by_variable["v1"],
            stable_combo_oid(1, Some("ML_1"))
        );
        assert_eq!(resolved.by_variable["v2"], "CL.1");
    }
}
