//! offerscan-core: best-effort field extraction from offer workbooks
//!
//! Each workbook is opened, its labeled data sheet and its identifier table
//! are located by fuzzy sheet names, values are pulled out by label and by
//! column header, and the result is cleaned into one flat record per file.
//! A bad file never stops a batch: it becomes a record with a `Fail` or
//! `Warning` status instead.

pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod reader;
pub mod record;
pub mod specs;

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use config::SheetRules;
use extract::{
    DuplicateTracker, Normalizer, extract_unique_column_values, locate_labels, resolve_sheet_name,
    resolve_sheet_name_filtered,
};
use reader::WorkbookHandle;

pub use config::OfferscanConfig;
pub use error::{ConfigError, ExtractError};
pub use reader::{CellValue, SheetSnapshot};
pub use record::{ExtractedRecord, ExtractionBatchResult, FieldValue, ReadStatus};
pub use specs::{ColumnSpec, ColumnSpecs, LabelSpec, LabelSpecs};

/// Receives progress while a batch runs
pub trait ExtractionObserver {
    /// Called before file `index` (1-based) of `total` is opened
    fn on_file_start(&mut self, _index: usize, _total: usize, _path: &Path) {}

    /// Called with the finished record of file `index`
    fn on_record(&mut self, _index: usize, _total: usize, _record: &ExtractedRecord) {}
}

/// Observer that ignores everything
pub struct SilentObserver;

impl ExtractionObserver for SilentObserver {}

/// Main extraction interface
pub struct Extractor {
    labels: LabelSpecs,
    columns: ColumnSpecs,
    sheets: SheetRules,
    normalizer: Normalizer,
}

/// Everything read from one workbook before it is turned into a record
struct Extraction {
    labels: BTreeMap<String, Option<CellValue>>,
    columns: Vec<(String, Option<FieldValue>)>,
    warnings: Vec<String>,
}

impl Extractor {
    /// Create an extractor with the default sheet and normalization rules
    pub fn new(labels: LabelSpecs, columns: ColumnSpecs) -> Result<Self, ConfigError> {
        Self::with_config(&OfferscanConfig::default(), labels, columns)
    }

    /// Create an extractor with a custom configuration
    pub fn with_config(
        config: &OfferscanConfig,
        labels: LabelSpecs,
        columns: ColumnSpecs,
    ) -> Result<Self, ConfigError> {
        config.validate(&labels, &columns)?;
        Ok(Self {
            labels,
            columns,
            sheets: config.sheets.compile()?,
            normalizer: Normalizer::new(config.normalize.clone()),
        })
    }

    /// Configured output fields: labels first, then table columns
    pub fn field_names(&self) -> Vec<String> {
        self.labels
            .names()
            .chain(self.columns.outputs())
            .map(str::to_string)
            .collect()
    }

    /// Extract every file in order, one record per file
    pub fn extract_batch<P: AsRef<Path>>(&self, paths: &[P]) -> ExtractionBatchResult {
        self.extract_batch_with(paths, &mut SilentObserver)
    }

    /// Same as [`Extractor::extract_batch`], reporting progress to `observer`
    pub fn extract_batch_with<P: AsRef<Path>>(
        &self,
        paths: &[P],
        observer: &mut dyn ExtractionObserver,
    ) -> ExtractionBatchResult {
        let total = paths.len();
        let mut records = Vec::with_capacity(total);
        let mut duplicates = DuplicateTracker::default();

        for (i, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            observer.on_file_start(i + 1, total, path);

            let mut record = self.extract_file(path);
            duplicates.check(&mut record);

            observer.on_record(i + 1, total, &record);
            records.push(record);
        }

        ExtractionBatchResult {
            columns: self.field_names(),
            records,
        }
    }

    /// Extract one workbook. Never fails: problems end up in the record's
    /// status and details.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> ExtractedRecord {
        let path = path.as_ref();
        let _span = tracing::info_span!("extract", file = %path.display()).entered();

        let full_path = std::path::absolute(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let record = self.read_guarded(full_path, file_name, || self.read_workbook(path));
        self.normalizer.normalize(record)
    }

    /// Run `read` and turn its error or panic into a `Fail` record
    fn read_guarded<F>(&self, full_path: String, file_name: String, read: F) -> ExtractedRecord
    where
        F: FnOnce() -> Result<Extraction, ExtractError>,
    {
        match panic::catch_unwind(AssertUnwindSafe(read)) {
            Ok(Ok(extraction)) => self.build_record(extraction, full_path, file_name),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "extraction failed");
                self.failed_record(full_path, file_name, e.to_string())
            }
            Err(payload) => {
                let e = ExtractError::Unexpected(panic_message(payload));
                tracing::error!(error = %e, "extraction panicked");
                self.failed_record(full_path, file_name, e.to_string())
            }
        }
    }

    fn failed_record(&self, full_path: String, file_name: String, cause: String) -> ExtractedRecord {
        let names = self.field_names();
        ExtractedRecord::failed(full_path, file_name, cause, names.iter().map(String::as_str))
    }

    /// Open the workbook, read both sheets, and drop the handle
    fn read_workbook(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let mut workbook = WorkbookHandle::open(path)?;

        let primary = resolve_sheet_name(
            workbook.sheet_names(),
            &self.sheets.primary,
            self.sheets.primary_fallback.as_deref(),
        )?;
        let sheet = workbook.snapshot(&primary)?;
        tracing::debug!(sheet = %primary, cells = sheet.len(), "data sheet read");

        let labels = locate_labels(&sheet, &self.labels);

        let mut warnings = Vec::new();
        let columns = if self.columns.is_empty() {
            Vec::new()
        } else {
            self.read_table(&mut workbook, &mut warnings)
        };

        Ok(Extraction {
            labels,
            columns,
            warnings,
        })
    }

    fn read_table(
        &self,
        workbook: &mut WorkbookHandle,
        warnings: &mut Vec<String>,
    ) -> Vec<(String, Option<FieldValue>)> {
        let mut values: Vec<(String, Option<FieldValue>)> = self
            .columns
            .outputs()
            .map(|name| (name.to_string(), None))
            .collect();

        let names = workbook.sheet_names().to_vec();
        let skip_images = self.sheets.skip_image_sheets;
        let table = resolve_sheet_name_filtered(&names, &self.sheets.table, None, |name| {
            skip_images && workbook.sheet_has_images(name)
        })
        .and_then(|name| workbook.snapshot(&name));

        let table = match table {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(error = %e, "table sheet unavailable");
                warnings.push(format!("table sheet: {}", e));
                return values;
            }
        };

        for (spec, slot) in self.columns.iter().zip(values.iter_mut()) {
            match extract_unique_column_values(&table, self.sheets.table_header_row, &spec.header) {
                Ok(value) => slot.1 = value,
                Err(e @ ExtractError::ColumnNotFound(_)) => {
                    tracing::warn!(sheet = %table.name, error = %e, "column skipped");
                }
                Err(e) => {
                    tracing::warn!(sheet = %table.name, error = %e, "column dropped");
                    warnings.push(e.to_string());
                }
            }
        }

        values
    }

    fn build_record(
        &self,
        extraction: Extraction,
        full_path: String,
        file_name: String,
    ) -> ExtractedRecord {
        let mut fields: BTreeMap<String, Option<FieldValue>> = extraction
            .labels
            .into_iter()
            .map(|(name, value)| (name, value.map(FieldValue::Scalar)))
            .collect();
        fields.extend(extraction.columns);

        let (read_status, read_details) = if extraction.warnings.is_empty() {
            (ReadStatus::Success, None)
        } else {
            (ReadStatus::Warning, Some(extraction.warnings.join("; ")))
        };

        ExtractedRecord {
            fields,
            full_path,
            file_name,
            read_status,
            read_details,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic while reading workbook".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        let labels = LabelSpecs::from_json_str(r#"{"client_name": ["Cliente", 0, 1]}"#).unwrap();
        let columns = ColumnSpecs::from_json_str(r#"{"Código UR": "unique_urs"}"#).unwrap();
        Extractor::new(labels, columns).unwrap()
    }

    #[test]
    fn test_panic_while_reading_becomes_fail() {
        let extractor = extractor();
        let record = extractor.read_guarded("/offers/a.xlsx".into(), "a.xlsx".into(), || {
            panic!("shared strings table truncated")
        });

        assert_eq!(record.read_status, ReadStatus::Fail);
        assert_eq!(record.file_name, "a.xlsx");
        let details = record.read_details.as_deref().unwrap();
        assert!(details.contains("unexpected failure"));
        assert!(details.contains("shared strings table truncated"));
        assert_eq!(record.fields.len(), 2);
        assert!(record.fields.values().all(|v| v.is_none()));
    }

    #[test]
    fn test_formatted_panic_message_is_kept() {
        let extractor = extractor();
        let record = extractor.read_guarded("/offers/b.xlsx".into(), "b.xlsx".into(), || {
            panic!("row {} out of range", 7)
        });
        assert_eq!(record.read_status, ReadStatus::Fail);
        assert!(record.read_details.unwrap().contains("row 7 out of range"));
    }

    #[test]
    fn test_reader_error_becomes_fail() {
        let extractor = extractor();
        let record = extractor.read_guarded("/offers/c.xlsx".into(), "c.xlsx".into(), || {
            Err(ExtractError::MissingSheet("FICHA".into()))
        });
        assert_eq!(record.read_status, ReadStatus::Fail);
        assert_eq!(
            record.read_details.as_deref(),
            Some("sheet 'FICHA' does not exist in the workbook")
        );
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(Box::new("static text")), "static text");
        assert_eq!(panic_message(Box::new(String::from("owned text"))), "owned text");
        assert_eq!(panic_message(Box::new(42_u8)), "panic while reading workbook");
    }
}
