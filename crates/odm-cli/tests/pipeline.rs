//! End-to-end pipeline tests against real files on disk.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use odm_cli::pipeline::{ConvertOptions, run_convert};
use odm_transform::stable_combo_oid;

fn options(input: &Path, output_dir: &Path, force_single_odm: bool) -> ConvertOptions {
    ConvertOptions {
        input: input.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        force_single_odm,
    }
}

#[test]
fn converts_a_small_workbook() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("ship.csv");
    fs::write(
        &input,
        "VARNAMES,HIERARCHY,DATA_TYPE,LABEL,LABEL_DE,VALUE_LABELS,VALUE_LABELS_DE,MISSING_LIST_TABLE\n\
         v001_sex,BASE|DEMO,integer,Sex,Geschlecht,1 = male | 2 = female,1 = maennlich | 2 = weiblich,MISSING_LIST_1\n\
         v002_height,BASE|DEMO,float,Body height,Koerpergroesse,,,\n",
    )
    .expect("write primary");
    fs::write(
        dir.path().join("MISSING_LIST_1.csv"),
        "CODE_VALUE,CODE_LABEL\n99,refused\n",
    )
    .expect("write sheet");
    let output_dir = dir.path().join("out");

    let result = run_convert(&options(&input, &output_dir, false)).expect("convert");
    assert_eq!(result.study, "ship");
    assert!(!result.has_errors(), "errors: {:?}", result.errors);
    assert_eq!(result.documents.len(), 1);

    let document = &result.documents[0];
    assert_eq!(document.event, "BASE_BASE_DEMO");
    assert_eq!(document.items, 2);
    assert_eq!(document.code_lists, 1);
    assert_eq!(
        document.path,
        output_dir.join("Study_ship_BASE_BASE_DEMO.xml")
    );

    let content = fs::read_to_string(&document.path).expect("read output");
    assert!(content.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(content.contains("SourceSystem=\"OpenEDC\""));
    // Every item definition precedes every code list.
    let last_item = content.rfind("<ItemDef ").expect("ItemDef present");
    let first_list = content.find("<CodeList ").expect("CodeList present");
    assert!(last_item < first_list);
    // The one referenced code list carries the variable+sheet combo identity.
    let combo_oid = stable_combo_oid(1, Some("MISSING_LIST_1"));
    assert!(content.contains(&format!("CodeListOID=\"{combo_oid}\"")));
    assert!(content.contains(&format!("OID=\"{combo_oid}\"")));
    // The sheet-only code reaches the union list.
    assert!(content.contains("CodedValue=\"99\""));
}

#[test]
fn rebalances_unless_forced_single() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("big.csv");
    let mut csv = String::from("VARNAMES,HIERARCHY,DCE\n");
    for i in 0..6000 {
        let branch = if i < 3000 { "S|V|a" } else { "S|V|b" };
        writeln!(csv, "v{i},{branch},EV").expect("format row");
    }
    fs::write(&input, csv).expect("write primary");

    let split_dir = dir.path().join("split");
    let result = run_convert(&options(&input, &split_dir, false)).expect("convert");
    assert!(!result.has_errors(), "errors: {:?}", result.errors);
    let mut events: Vec<&str> = result
        .documents
        .iter()
        .map(|document| document.event.as_str())
        .collect();
    events.sort_unstable();
    assert_eq!(events, vec!["S_V_a", "S_V_b"]);
    assert!(split_dir.join("Study_big_S_V_a.xml").is_file());
    assert!(split_dir.join("Study_big_S_V_b.xml").is_file());

    let single_dir = dir.path().join("single");
    let result = run_convert(&options(&input, &single_dir, true)).expect("convert");
    assert!(!result.has_errors(), "errors: {:?}", result.errors);
    assert_eq!(result.documents.len(), 1);
    assert_eq!(result.documents[0].event, "EV");
    assert_eq!(result.documents[0].items, 6000);
    assert!(single_dir.join("Study_big_EV.xml").is_file());
}

#[test]
fn missing_required_column_fails_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("broken.csv");
    fs::write(&input, "LABEL,HIERARCHY\nSex,BASE|DEMO\n").expect("write primary");

    let error = run_convert(&options(&input, &dir.path().join("out"), false))
        .expect_err("convert should fail");
    assert!(error.to_string().contains("VARNAMES"));
}
