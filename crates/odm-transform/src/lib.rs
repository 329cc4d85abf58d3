//! Transformation core of the dictionary-to-ODM converter.
//!
//! - **value_labels**: inline `code=label|...` cell parsing
//! - **registry**: code-list deduplication across variables
//! - **grouping**: event/segment partitioning and oversize rebalancing
//! - **combo**: reference resolution and union code-list building

pub mod combo;
pub mod grouping;
pub mod registry;
pub mod value_labels;

pub use combo::{
    ComboKey, ResolvedReferences, UnionCodeList, UnionItem, build_union_codelist,
    resolve_references, stable_combo_oid,
};
pub use grouping::{
    CHUNK_SIZE, EVENT_ROW_CEILING, GroupHierarchy, SegmentBuckets, group_rows, rebalance,
};
pub use registry::{CodeList, CodeListRegistry, datatype_of};
pub use value_labels::{ValueLabels, parse_value_labels};
