//! Shared constants and helpers for ODM document assembly.

use crate::xml::XmlElement;

/// ODM namespace.
pub const ODM_NS: &str = "http://www.cdisc.org/ns/odm/v1.3";

/// XML digital-signature namespace carried on the root for compatibility.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Emitted ODM version.
pub const ODM_VERSION: &str = "1.3.2";

/// Tool identifier the consuming EDC system keys on.
pub const SOURCE_SYSTEM: &str = "OpenEDC";

/// Fixed study description carried by every document.
pub const STUDY_DESCRIPTION: &str =
    "This example study aims at providing an overview of the capabilities of OpenEDC.";

/// Separator used when encoding the source column layout into ProtocolName.
pub const PROTOCOL_SEPARATOR: &str = "---";

/// Scalar item data types the target system accepts.
pub const VALID_ITEM_DATA_TYPES: &[&str] = &[
    "integer", "float", "double", "date", "time", "datetime", "string", "boolean",
];

/// Validate a source `DATA_TYPE` cell; anything absent or unrecognized
/// degrades to `"string"`.
pub fn normalize_item_datatype(raw: Option<&str>) -> &str {
    match raw {
        Some(value) if VALID_ITEM_DATA_TYPES.contains(&value) => value,
        _ => "string",
    }
}

/// A `<TranslatedText xml:lang="..">` element.
pub fn translated_text(lang: &str, text: &str) -> XmlElement {
    XmlElement::new("TranslatedText")
        .attr("xml:lang", lang)
        .text(text)
}
