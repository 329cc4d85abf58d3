//! Per-event ODM document assembly.
//!
//! One document is built for each top-level study event after rebalancing:
//! study header, event/form/item-group scaffolding, one item per variable
//! row, and the unioned code lists the event's rows reference. Identifier
//! counters are owned by the document being built; nothing leaks across
//! documents. Item definitions are emitted before any code list, which the
//! consuming system requires.

use std::collections::BTreeMap;

use anyhow::Result;

use odm_model::{ColumnIndex, Field, NULL_MARKER, Row, Table};
use odm_transform::{
    CodeListRegistry, ResolvedReferences, SegmentBuckets, UnionCodeList, build_union_codelist,
    resolve_references,
};

use crate::common::{
    ODM_NS, ODM_VERSION, PROTOCOL_SEPARATOR, SOURCE_SYSTEM, STUDY_DESCRIPTION, XMLDSIG_NS,
    normalize_item_datatype, translated_text,
};
use crate::xml::XmlElement;

/// Read-only view of the loaded workbook the assembler draws from.
#[derive(Debug, Clone, Copy)]
pub struct StudySource<'a> {
    /// Base name of the source file; becomes the study OID.
    pub study_name: &'a str,
    /// Name of the primary dictionary sheet.
    pub sheet_name: &'a str,
    /// Header row of the primary sheet, in source order.
    pub columns: &'a [String],
    pub index: &'a ColumnIndex,
    /// Missing-value sheets by name.
    pub sheets: &'a BTreeMap<String, Table>,
}

/// Identifier counters scoped to one document.
#[derive(Debug, Default)]
struct OidCounters {
    item: usize,
    group: usize,
    form: usize,
}

impl OidCounters {
    fn next_item(&mut self) -> String {
        self.item += 1;
        format!("I.{}", self.item)
    }

    fn next_group(&mut self) -> String {
        self.group += 1;
        format!("IG.{}", self.group)
    }

    fn next_form(&mut self) -> String {
        self.form += 1;
        format!("F.{}", self.form)
    }
}

/// ProtocolName carries the source base name, the primary sheet name and
/// every `column.position` pair, `---`-separated. The single trailing
/// character trim reproduces the historical output byte-for-byte; consumers
/// reconstruct the column layout from this string.
fn protocol_name(source: &StudySource) -> String {
    let mut columns_part = String::from(PROTOCOL_SEPARATOR);
    for (position, name) in source.columns.iter().enumerate() {
        columns_part.push_str(name);
        columns_part.push('.');
        columns_part.push_str(&position.to_string());
        columns_part.push_str(PROTOCOL_SEPARATOR);
    }
    columns_part.pop();
    format!(
        "{}{}{}{}",
        source.study_name, PROTOCOL_SEPARATOR, source.sheet_name, columns_part
    )
}

fn item_def(
    row: &Row,
    oid: &str,
    source: &StudySource,
    var_col: usize,
    resolved: &ResolvedReferences,
) -> XmlElement {
    let index = source.index;
    let varname = row.text(var_col);
    let datatype = normalize_item_datatype(row.field(index.field(Field::DataType)));
    let mut item = XmlElement::new("ItemDef")
        .attr("OID", oid)
        .attr("Name", varname.unwrap_or(NULL_MARKER))
        .attr("DataType", datatype);

    let note = row.field(index.field(Field::Note));
    let note_de = row.field(index.field(Field::NoteDe));
    if note.is_some() || note_de.is_some() {
        let mut description = XmlElement::new("Description");
        if let Some(text) = note_de {
            description.push(translated_text("de", text));
        }
        if let Some(text) = note {
            description.push(translated_text("en", text));
        }
        item.push(description);
    }

    let label = row.field(index.field(Field::Label));
    let label_de = row.field(index.field(Field::LabelDe));
    let mut question = XmlElement::new("Question");
    if label.is_some() || label_de.is_some() {
        if let Some(text) = label_de {
            question.push(translated_text("de", text));
        }
        if let Some(text) = label {
            question.push(translated_text("en", text));
        }
    } else {
        question.push(translated_text("de", NULL_MARKER));
        question.push(translated_text("en", NULL_MARKER));
    }
    item.push(question);

    if let Some(oid) = varname.and_then(|name| resolved.by_variable.get(name)) {
        item.push(XmlElement::new("CodeListRef").attr("CodeListOID", oid.as_str()));
    }

    // Full traceability: one alias per populated source column.
    for (position, column) in source.columns.iter().enumerate() {
        if let Some(value) = row.text(position) {
            item.push(
                XmlElement::new("Alias")
                    .attr("Context", column.as_str())
                    .attr("Name", value),
            );
        }
    }
    item
}

fn code_list_element(union: &UnionCodeList) -> XmlElement {
    let mut element = XmlElement::new("CodeList")
        .attr("OID", union.oid.as_str())
        .attr("Name", union.oid.as_str())
        .attr("DataType", union.datatype);
    for item in &union.items {
        let mut entry = XmlElement::new("CodeListItem").attr("CodedValue", item.code.as_str());
        let mut decode = XmlElement::new("Decode");
        if let Some(text) = &item.label_de {
            decode.push(translated_text("de", text));
        }
        if let Some(text) = &item.label_en {
            decode.push(translated_text("en", text));
        }
        entry.push(decode);
        for (context, name) in &item.aliases {
            entry.push(
                XmlElement::new("Alias")
                    .attr("Context", context.as_str())
                    .attr("Name", name.as_str()),
            );
        }
        element.push(entry);
    }
    element
}

/// Assemble the complete document for one study event.
///
/// `timestamp` is the `CreationDateTime` value; the caller provides it so
/// output is reproducible under test.
pub fn assemble_document(
    source: &StudySource,
    registry: &CodeListRegistry,
    event: &str,
    segments: &SegmentBuckets,
    timestamp: &str,
) -> Result<XmlElement> {
    // Phase 1: resolve every code-list reference before any emission.
    let resolved = resolve_references(segments, source.index, registry)?;
    let var_col = source.index.require(Field::VarNames)?;
    let mut counters = OidCounters::default();

    let mut metadata = XmlElement::new("MetaDataVersion")
        .attr("OID", "MDV.1")
        .attr("Name", "MetaDataVersion");
    metadata.push(
        XmlElement::new("Protocol").child(
            XmlElement::new("StudyEventRef")
                .attr("StudyEventOID", "SE.1")
                .attr("Mandatory", "No"),
        ),
    );

    let form_oids: Vec<String> = segments.iter().map(|_| counters.next_form()).collect();
    let mut study_event = XmlElement::new("StudyEventDef")
        .attr("OID", "SE.1")
        .attr("Name", event)
        .attr("Repeating", "No")
        .attr("Type", "Unscheduled");
    for form_oid in &form_oids {
        study_event.push(
            XmlElement::new("FormRef")
                .attr("FormOID", form_oid.as_str())
                .attr("Mandatory", "No"),
        );
    }
    metadata.push(study_event);

    let group_oids: Vec<String> = segments.iter().map(|_| counters.next_group()).collect();
    for ((segment, _), (form_oid, group_oid)) in
        segments.iter().zip(form_oids.iter().zip(&group_oids))
    {
        metadata.push(
            XmlElement::new("FormDef")
                .attr("OID", form_oid.as_str())
                .attr("Name", segment.as_str())
                .attr("Repeating", "No")
                .child(
                    XmlElement::new("ItemGroupRef")
                        .attr("ItemGroupOID", group_oid.as_str())
                        .attr("Mandatory", "No"),
                ),
        );
    }

    let mut item_oids = Vec::new();
    for ((segment, rows), group_oid) in segments.iter().zip(&group_oids) {
        let mut group = XmlElement::new("ItemGroupDef")
            .attr("OID", group_oid.as_str())
            .attr("Name", segment.as_str())
            .attr("Repeating", "No");
        let description = format!("Item Group {segment}");
        group.push(
            XmlElement::new("Description")
                .child(translated_text("de", &description))
                .child(translated_text("en", &description)),
        );
        for _ in rows {
            let item_oid = counters.next_item();
            group.push(
                XmlElement::new("ItemRef")
                    .attr("ItemOID", item_oid.as_str())
                    .attr("Mandatory", "No"),
            );
            item_oids.push(item_oid);
        }
        metadata.push(group);
    }

    for (row, item_oid) in segments.values().flatten().zip(&item_oids) {
        metadata.push(item_def(row, item_oid, source, var_col, &resolved));
    }

    // Phase 2: union code lists, after every item definition.
    for combo in &resolved.combos {
        let Some(base) = registry.get(combo.base) else {
            continue;
        };
        let sheet_table = combo
            .sheet
            .as_deref()
            .and_then(|name| source.sheets.get(name));
        let union = build_union_codelist(base, combo.sheet.as_deref(), sheet_table);
        metadata.push(code_list_element(&union));
    }

    let global_variables = XmlElement::new("GlobalVariables")
        .child(
            XmlElement::new("StudyName")
                .text(format!("Study {}_{}", source.study_name, event)),
        )
        .child(XmlElement::new("StudyDescription").text(STUDY_DESCRIPTION))
        .child(XmlElement::new("ProtocolName").text(protocol_name(source)));

    let study = XmlElement::new("Study")
        .attr("OID", source.study_name)
        .child(global_variables)
        .child(metadata);

    Ok(XmlElement::new("ODM")
        .attr("xmlns", ODM_NS)
        .attr("xmlns:ns2", XMLDSIG_NS)
        .attr("FileType", "Snapshot")
        .attr("FileOID", format!("Project {}", source.study_name))
        .attr("CreationDateTime", timestamp)
        .attr("ODMVersion", ODM_VERSION)
        .attr("SourceSystem", SOURCE_SYSTEM)
        .child(study))
}
