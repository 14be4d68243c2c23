//! Extracted records and batch results

use crate::reader::CellValue;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of reading one workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReadStatus {
    Success,
    Warning,
    Fail,
}

impl ReadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadStatus::Success => "Success",
            ReadStatus::Warning => "Warning",
            ReadStatus::Fail => "Fail",
        }
    }
}

impl fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of one extracted field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(CellValue),
    List(Vec<CellValue>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&CellValue> {
        match self {
            FieldValue::Scalar(value) => Some(value),
            FieldValue::List(_) => None,
        }
    }
}

impl From<CellValue> for FieldValue {
    fn from(value: CellValue) -> Self {
        FieldValue::Scalar(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(value) => write!(f, "{}", value),
            FieldValue::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Scalar(value) => value.serialize(serializer),
            FieldValue::List(values) => values.serialize(serializer),
        }
    }
}

/// Everything extracted from one workbook
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedRecord {
    /// Configured label and column fields; `None` when nothing was found
    pub fields: BTreeMap<String, Option<FieldValue>>,
    pub full_path: String,
    pub file_name: String,
    pub read_status: ReadStatus,
    /// Cause of a non-success status
    pub read_details: Option<String>,
}

impl ExtractedRecord {
    /// Record for a file that could not be processed at all
    pub fn failed<'a>(
        full_path: impl Into<String>,
        file_name: impl Into<String>,
        cause: impl Into<String>,
        field_names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            fields: field_names
                .into_iter()
                .map(|name| (name.to_string(), None))
                .collect(),
            full_path: full_path.into(),
            file_name: file_name.into(),
            read_status: ReadStatus::Fail,
            read_details: Some(cause.into()),
        }
    }

    /// Value of a field, `None` when missing or empty
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).and_then(|v| v.as_ref())
    }

    /// Lower a successful record to `Warning` and append a note.
    ///
    /// A failed record keeps its status; the note is still recorded.
    pub(crate) fn add_warning(&mut self, note: impl Into<String>) {
        if self.read_status == ReadStatus::Success {
            self.read_status = ReadStatus::Warning;
        }
        let note = note.into();
        self.read_details = Some(match self.read_details.take() {
            Some(existing) if !existing.is_empty() => format!("{}; {}", existing, note),
            _ => note,
        });
    }

    /// Flat row in the given column order, then provenance and status
    pub fn to_row(&self, columns: &[String]) -> Map<String, Value> {
        let mut row = Map::new();
        for column in columns {
            let value = match self.get(column) {
                Some(v) => serde_json::to_value(v).unwrap_or(Value::Null),
                None => Value::Null,
            };
            row.insert(column.clone(), value);
        }
        row.insert("full_path".into(), Value::String(self.full_path.clone()));
        row.insert("file_name".into(), Value::String(self.file_name.clone()));
        row.insert(
            "read_status".into(),
            Value::String(self.read_status.as_str().to_string()),
        );
        row.insert(
            "read_details".into(),
            self.read_details
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        row
    }
}

/// Records of one batch, in input order
#[derive(Debug, Clone, Default)]
pub struct ExtractionBatchResult {
    /// Configured fields: labels first, then column outputs
    pub columns: Vec<String>,
    pub records: Vec<ExtractedRecord>,
}

impl ExtractionBatchResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedRecord> {
        self.records.iter()
    }

    pub fn count(&self, status: ReadStatus) -> usize {
        self.records
            .iter()
            .filter(|r| r.read_status == status)
            .count()
    }

    /// Header of the tabular output
    pub fn header(&self) -> Vec<String> {
        let mut header = self.columns.clone();
        header.extend(crate::specs::RESERVED_FIELDS.iter().map(|s| s.to_string()));
        header
    }

    /// One flat row per record, all with the same keys
    pub fn rows(&self) -> Vec<Map<String, Value>> {
        self.records.iter().map(|r| r.to_row(&self.columns)).collect()
    }
}
