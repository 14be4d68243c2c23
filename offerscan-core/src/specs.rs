//! Label and column specs loaded from JSON
//!
//! Both files are JSON objects whose key order is meaningful: labels are
//! tried in file order, and output columns follow file order.

use crate::error::ConfigError;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Field names every record carries on top of the configured ones
pub const RESERVED_FIELDS: [&str; 4] = ["full_path", "file_name", "read_status", "read_details"];

/// Largest row/column displacement that can still land inside a sheet
pub const MAX_ROW_OFFSET: i64 = 1_048_576;
pub const MAX_COL_OFFSET: i64 = 16_384;

/// Where to find one labeled value.
///
/// `offset_up` is subtracted from the matching cell's row and
/// `offset_right` added to its column.
#[derive(Debug, Clone)]
pub struct LabelSpec {
    pub name: String,
    pub pattern: String,
    pub offset_up: i64,
    pub offset_right: i64,
    matcher: Regex,
}

impl LabelSpec {
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        offset_up: i64,
        offset_right: i64,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let pattern = pattern.into();
        // Anchored at the start, open at the end
        let matcher = RegexBuilder::new(&format!("^(?:{})", pattern))
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                name: name.clone(),
                pattern: pattern.clone(),
                source,
            })?;

        Ok(Self {
            name,
            pattern,
            offset_up,
            offset_right,
            matcher,
        })
    }

    /// Whether a cell's text matches this label
    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    /// Target position for a label found at `(row, col)`, or `None` when
    /// it falls outside the sheet.
    pub fn target(&self, row: u32, col: u32) -> Option<(u32, u32)> {
        let target_row = i64::from(row).checked_sub(self.offset_up)?;
        let target_col = i64::from(col).checked_add(self.offset_right)?;
        if target_row < 1 || target_col < 1 {
            return None;
        }
        Some((
            u32::try_from(target_row).ok()?,
            u32::try_from(target_col).ok()?,
        ))
    }
}

/// Ordered set of label specs
#[derive(Debug, Clone, Default)]
pub struct LabelSpecs {
    specs: Vec<LabelSpec>,
}

impl LabelSpecs {
    pub fn new(specs: Vec<LabelSpec>) -> Self {
        Self { specs }
    }

    /// Parse `{ "field": ["pattern", row_offset, col_offset] }`
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let object = parse_object(content)?;
        let mut specs = Vec::with_capacity(object.len());

        for (name, entry) in object {
            let (pattern, up, right) = serde_json::from_value::<(String, i64, i64)>(entry)
                .map_err(|e| ConfigError::MalformedLabel {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            specs.push(LabelSpec::new(name, pattern, up, right)?);
        }

        Ok(Self { specs })
    }

    /// Load label specs from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read label specs: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid label specs in {}", path.display()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelSpec> {
        self.specs.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// One table column: the header to look for and the field it feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub header: String,
    pub output: String,
}

/// Ordered set of column specs
#[derive(Debug, Clone, Default)]
pub struct ColumnSpecs {
    specs: Vec<ColumnSpec>,
}

impl ColumnSpecs {
    pub fn new(specs: Vec<ColumnSpec>) -> Self {
        Self { specs }
    }

    /// Parse `{ "source header": "output_field" }`
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let object = parse_object(content)?;
        let mut specs = Vec::with_capacity(object.len());

        for (header, output) in object {
            match output {
                Value::String(output) if !output.trim().is_empty() => {
                    specs.push(ColumnSpec { header, output })
                }
                _ => return Err(ConfigError::MalformedColumn { header }),
            }
        }

        Ok(Self { specs })
    }

    /// Load column specs from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read column specs: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid column specs in {}", path.display()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.specs.iter()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.output.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn parse_object(content: &str) -> Result<Map<String, Value>, ConfigError> {
    match serde_json::from_str::<Value>(content)? {
        Value::Object(object) => Ok(object),
        _ => Err(ConfigError::NotAnObject),
    }
}
