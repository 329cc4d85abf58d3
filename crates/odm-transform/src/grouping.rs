//! Two-level grouping of dictionary rows into study events and segments.
//!
//! Rows are partitioned by an (event, segment) key pair derived from the
//! pipe-delimited `HIERARCHY` path, with explicit `DCE` and `STUDY_SEGMENT`
//! overrides. Oversized events are rebalanced so no single output document
//! exceeds the consumer's item ceiling: first by descending one hierarchy
//! level, then by fixed-size chunking when the path depth is exhausted.

use indexmap::IndexMap;
use tracing::debug;

use odm_model::{ColumnIndex, Field, PLACEHOLDER_SEGMENT, Result, Row};

/// Segment name to ordered rows, in first-seen order.
pub type SegmentBuckets = IndexMap<String, Vec<Row>>;

/// Event name to segment buckets, in first-seen order. Every source row
/// lives in exactly one (event, segment) bucket.
pub type GroupHierarchy = IndexMap<String, SegmentBuckets>;

/// Hard per-document row ceiling enforced by the consuming EDC system.
pub const EVENT_ROW_CEILING: usize = 5700;

/// Rows per chunk when an event has to be split without hierarchy support.
pub const CHUNK_SIZE: usize = 4500;

/// Default group name for a hierarchy path: the first pipe segment, followed
/// by every segment joined with underscores. `A|B` becomes `A_A_B`. The
/// repeated first segment is the historical output shape and downstream
/// consumers parse it literally, so it is preserved as-is.
fn derived_group_name(hierarchy: &str) -> String {
    let mut parts = hierarchy.split('|');
    let mut name = parts.next().unwrap_or("").to_string();
    name.push('_');
    name.push_str(&hierarchy.replace('|', "_"));
    name
}

fn or_placeholder(name: String) -> String {
    if name.is_empty() {
        PLACEHOLDER_SEGMENT.to_string()
    } else {
        name
    }
}

fn insert_row(groups: &mut GroupHierarchy, event: String, segment: String, row: Row) {
    groups
        .entry(or_placeholder(event))
        .or_default()
        .entry(or_placeholder(segment))
        .or_default()
        .push(row);
}

/// Partition rows into the initial event/segment hierarchy.
///
/// Fails only when the variable-name or hierarchy column is absent from the
/// header; every row-level irregularity degrades to the placeholder bucket.
pub fn group_rows(rows: &[Row], index: &ColumnIndex) -> Result<GroupHierarchy> {
    // The variable-name column must never silently resolve to position 0.
    index.require(Field::VarNames)?;
    let hierarchy_col = index.require(Field::Hierarchy)?;
    let dce_col = index.field(Field::Dce);
    let segment_col = index.field(Field::StudySegment);

    let mut groups = GroupHierarchy::new();
    for row in rows {
        let derived = row
            .text(hierarchy_col)
            .map(derived_group_name)
            .unwrap_or_default();
        let event = row
            .field(dce_col)
            .map(str::to_string)
            .unwrap_or_else(|| derived.clone());
        let segment = row.field(segment_col).map(str::to_string).unwrap_or(derived);
        insert_row(&mut groups, event, segment, row.clone());
    }
    Ok(groups)
}

fn event_total(segments: &SegmentBuckets) -> usize {
    segments.values().map(Vec::len).sum()
}

fn oversized_events(groups: &GroupHierarchy) -> Vec<String> {
    groups
        .iter()
        .filter(|(_, segments)| event_total(segments) > EVENT_ROW_CEILING)
        .map(|(event, _)| event.clone())
        .collect()
}

/// Re-split an oversized event one hierarchy level deeper: the new event key
/// is the first `depth + 1` path segments joined with underscores, or the
/// raw path when it is too shallow to descend further.
fn split_by_depth(
    groups: &mut GroupHierarchy,
    events: &[String],
    hierarchy_col: usize,
    segment_col: Option<usize>,
    depth: usize,
) {
    for event in events {
        let Some(segments) = groups.shift_remove(event) else {
            continue;
        };
        for (_, rows) in segments {
            for row in rows {
                let new_event = match row.text(hierarchy_col) {
                    Some(path) => {
                        let parts: Vec<&str> = path.split('|').collect();
                        if parts.len() > depth {
                            parts[..=depth].join("_")
                        } else {
                            path.to_string()
                        }
                    }
                    None => String::new(),
                };
                let new_segment = row
                    .field(segment_col)
                    .map(str::to_string)
                    .unwrap_or_default();
                insert_row(groups, new_event, new_segment, row);
            }
        }
    }
}

/// Split an oversized event into fixed-size chunks in original row order.
/// Chunk boundaries depend on row count alone: every chunk holds exactly
/// [`CHUNK_SIZE`] rows except the final, shorter one.
fn split_by_chunks(groups: &mut GroupHierarchy, events: &[String]) {
    for event in events {
        let Some(segments) = groups.shift_remove(event) else {
            continue;
        };
        let mut chunk = 0usize;
        let mut filled = 0usize;
        for (_, rows) in segments {
            for row in rows {
                if filled == CHUNK_SIZE {
                    filled = 0;
                    chunk += 1;
                }
                let key = format!("{event}_{chunk}");
                insert_row(groups, key.clone(), key, row);
                filled += 1;
            }
        }
    }
}

/// Rebalance the hierarchy until no event exceeds [`EVENT_ROW_CEILING`].
///
/// The first oversize pass descends to hierarchy depth 2 (depths 0 and 1 are
/// the mandatory top path levels); any event still oversized after that is
/// chunked. Running this on an already balanced hierarchy changes nothing.
pub fn rebalance(groups: &mut GroupHierarchy, index: &ColumnIndex) -> Result<()> {
    let hierarchy_col = index.require(Field::Hierarchy)?;
    let segment_col = index.field(Field::StudySegment);

    let mut depth = 2usize;
    loop {
        let oversized = oversized_events(groups);
        if oversized.is_empty() {
            return Ok(());
        }
        debug!(depth, events = oversized.len(), "rebalancing oversized events");
        if depth == 2 {
            split_by_depth(groups, &oversized, hierarchy_col, segment_col, depth);
        } else {
            split_by_chunks(groups, &oversized);
        }
        depth += 1;
    }
}
