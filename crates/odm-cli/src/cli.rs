//! CLI argument definitions for the dictionary-to-ODM converter.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "dq2odm",
    version,
    about = "Convert a dataquieR variable dictionary to ODM-XML",
    long_about = "Convert a tabular clinical-study variable dictionary into \
                  CDISC-ODM-flavored XML documents for OpenEDC.\n\n\
                  The primary CSV file is the variable dictionary; sibling CSV \
                  files in the same directory are read as missing-value sheets, \
                  keyed by file name."
)]
pub struct Cli {
    /// Path to the primary dictionary CSV file.
    #[arg(value_name = "DICTIONARY")]
    pub input: PathBuf,

    /// Output directory for the generated documents.
    #[arg(long = "output-dir", value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Write all items regardless of size, skipping oversize rebalancing.
    ///
    /// The per-document item ceiling of the consuming system may be
    /// exceeded; use only when the target tolerates oversized documents.
    #[arg(long = "force-single-odm")]
    pub force_single_odm: bool,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
