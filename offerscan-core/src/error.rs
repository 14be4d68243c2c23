//! Error taxonomy for extraction and configuration

use thiserror::Error;

/// Errors raised while extracting one workbook.
///
/// None of these ever leave [`crate::Extractor::extract_file`]: they are
/// turned into the record's status and details there.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open workbook: {0}")]
    FileOpen(String),

    #[error("no sheet matches '{pattern}'")]
    SheetNotFound { pattern: String },

    #[error("sheet '{0}' does not exist in the workbook")]
    MissingSheet(String),

    #[error("cannot read sheet '{sheet}': {reason}")]
    SheetRead { sheet: String, reason: String },

    #[error("column '{0}' not found in table header")]
    ColumnNotFound(String),

    #[error("cannot order values of column '{column}': {left} and {right} are not comparable")]
    IncomparableValues {
        column: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

/// Errors in the label/column specs or in the run configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("spec file must contain a JSON object at the top level")]
    NotAnObject,

    #[error("invalid JSON in spec file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("label '{name}' must be [pattern, row_offset, col_offset]: {reason}")]
    MalformedLabel { name: String, reason: String },

    #[error("column '{header}' must map to an output field name")]
    MalformedColumn { header: String },

    #[error("invalid pattern '{pattern}' for '{name}': {source}")]
    InvalidPattern {
        name: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("offset ({up}, {right}) of label '{name}' is outside the sheet address space")]
    OffsetOutOfRange { name: String, up: i64, right: i64 },

    #[error("field '{0}' is defined more than once")]
    DuplicateField(String),

    #[error("field '{0}' is reserved for provenance and status")]
    ReservedField(String),
}
