//! Inline value-label parsing.
//!
//! A `VALUE_LABELS` cell holds `code=label` pairs joined by `|`, for example
//! `1=<=2cm|2=>2cm`. Labels may contain `=`, so only the first `=` of a pair
//! splits it. Legacy rows sometimes carry a bare description with no code at
//! all; those are stored under [`odm_model::LABEL_ONLY_CODE`].

use indexmap::IndexMap;

use odm_model::LABEL_ONLY_CODE;

/// Ordered code-to-label mapping parsed from one cell.
pub type ValueLabels = IndexMap<String, String>;

/// Parse an optional value-label cell. A missing cell yields an empty
/// mapping, never an error. Codes are trimmed; labels are kept verbatim.
pub fn parse_value_labels(raw: Option<&str>) -> ValueLabels {
    let mut labels = ValueLabels::new();
    let Some(raw) = raw else {
        return labels;
    };
    for pair in raw.split('|') {
        match pair.split_once('=') {
            Some((code, label)) => {
                labels.insert(code.trim().to_string(), label.to_string());
            }
            None => {
                labels.insert(LABEL_ONLY_CODE.to_string(), pair.trim().to_string());
            }
        }
    }
    labels
}
