//! Conversion pipeline with explicit stages.
//!
//! 1. **Ingest**: read the primary dictionary and its missing-value sheets
//! 2. **Register**: parse value labels and deduplicate code lists
//! 3. **Group**: partition rows into events and segments, then rebalance
//! 4. **Emit**: assemble and write one XML document per study event
//!
//! A failing event document is reported and skipped; the remaining events
//! are still written.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, info_span, warn};

use odm_ingest::{Workbook, load_workbook};
use odm_model::{ColumnIndex, Field, Table};
use odm_report::{StudySource, assemble_document, write_document};
use odm_transform::{
    CodeListRegistry, SegmentBuckets, group_rows, parse_value_labels, rebalance,
};

/// Options for one conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub force_single_odm: bool,
}

/// Per-document outcome for the run summary.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub event: String,
    pub forms: usize,
    pub items: usize,
    pub code_lists: usize,
    pub path: PathBuf,
}

/// Result of one conversion run.
#[derive(Debug)]
pub struct ConvertResult {
    pub study: String,
    pub output_dir: PathBuf,
    pub documents: Vec<DocumentSummary>,
    pub errors: Vec<String>,
}

impl ConvertResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

fn build_registry(table: &Table, index: &ColumnIndex) -> CodeListRegistry {
    let var_col = index.field(Field::VarNames);
    let en_col = index.field(Field::ValueLabels);
    let de_col = index.field(Field::ValueLabelsDe);
    let mut registry = CodeListRegistry::new();
    for row in &table.rows {
        let Some(variable) = row.field(var_col) else {
            continue;
        };
        let en = parse_value_labels(row.field(en_col));
        let de = parse_value_labels(row.field(de_col));
        registry.register(variable, en, de);
    }
    registry
}

/// Event keys become part of the output file name; anything the filesystem
/// could interpret is replaced.
fn sanitize_file_component(raw: &str) -> String {
    raw.chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' => '_',
            _ => ch,
        })
        .collect()
}

fn write_event_document(
    source: &StudySource,
    registry: &CodeListRegistry,
    workbook: &Workbook,
    event: &str,
    segments: &SegmentBuckets,
    timestamp: &str,
    output_dir: &Path,
) -> Result<DocumentSummary> {
    let document = assemble_document(source, registry, event, segments, timestamp)?;
    let file_name = format!(
        "Study_{}_{}.xml",
        workbook.name,
        sanitize_file_component(event)
    );
    let path = output_dir.join(file_name);
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    write_document(&document, BufWriter::new(file))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(DocumentSummary {
        event: event.to_string(),
        forms: segments.len(),
        items: segments.values().map(Vec::len).sum(),
        code_lists: document.find_all("CodeList").len(),
        path,
    })
}

/// Run the whole conversion for one workbook.
pub fn run_convert(options: &ConvertOptions) -> Result<ConvertResult> {
    let workbook = {
        let _span = info_span!("ingest", input = %options.input.display()).entered();
        load_workbook(&options.input)?
    };
    let index = ColumnIndex::new(&workbook.primary.columns);

    let registry = {
        let _span = info_span!("register").entered();
        let registry = build_registry(&workbook.primary, &index);
        info!(code_lists = registry.len(), "code lists registered");
        registry
    };

    let mut groups = {
        let _span = info_span!("group").entered();
        group_rows(&workbook.primary.rows, &index)?
    };
    if options.force_single_odm {
        info!("--force-single-odm set, skipping rebalance");
    } else {
        let _span = info_span!("rebalance").entered();
        rebalance(&mut groups, &index)?;
    }
    info!(events = groups.len(), "grouping complete");

    fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("create {}", options.output_dir.display()))?;

    let source = StudySource {
        study_name: &workbook.name,
        sheet_name: &workbook.primary.name,
        columns: &workbook.primary.columns,
        index: &index,
        sheets: &workbook.sheets,
    };
    let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();

    let mut documents = Vec::new();
    let mut errors = Vec::new();
    for (event, segments) in &groups {
        let _span = info_span!("emit", event = %event).entered();
        match write_event_document(
            &source,
            &registry,
            &workbook,
            event,
            segments,
            &timestamp,
            &options.output_dir,
        ) {
            Ok(summary) => {
                info!(items = summary.items, path = %summary.path.display(), "document written");
                documents.push(summary);
            }
            Err(error) => {
                warn!(%event, "document failed: {error:#}");
                errors.push(format!("{event}: {error:#}"));
            }
        }
    }

    Ok(ConvertResult {
        study: workbook.name.clone(),
        output_dir: options.output_dir.clone(),
        documents,
        errors,
    })
}
