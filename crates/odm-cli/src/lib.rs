//! Library surface of the converter CLI: logging setup, the conversion
//! pipeline, and the terminal summary. The binary in `main.rs` only parses
//! arguments and wires these together.

pub mod logging;
pub mod pipeline;
pub mod summary;
