//! Extraction stages applied to each workbook

pub mod columns;
pub mod dates;
pub mod duplicates;
pub mod labels;
pub mod normalize;
pub mod numbers;
pub mod sheets;

pub use columns::extract_unique_column_values;
pub use duplicates::DuplicateTracker;
pub use labels::locate_labels;
pub use normalize::Normalizer;
pub use sheets::{resolve_sheet_name, resolve_sheet_name_filtered};
