//! ODM document assembly and serialization.
//!
//! - **assembler**: one element tree per study event
//! - **xml**: generic element tree and quick-xml serialization
//! - **common**: namespaces, fixed texts, datatype validation

pub mod assembler;
pub mod common;
pub mod xml;

pub use assembler::{StudySource, assemble_document};
pub use xml::{XmlElement, document_to_string, write_document};
