//! Source ingestion for the dictionary-to-ODM converter.
//!
//! - **csv_sheet**: one CSV file to a positional [`odm_model::Table`]
//! - **workbook**: primary dictionary plus sibling missing-value sheets

pub mod csv_sheet;
pub mod workbook;

pub use csv_sheet::read_csv_sheet;
pub use workbook::{Workbook, load_workbook};
