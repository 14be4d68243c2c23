//! Run configuration (`offerscan.toml`)

use crate::error::ConfigError;
use crate::reader::CellValue;
use crate::specs::{ColumnSpecs, LabelSpecs, MAX_COL_OFFSET, MAX_ROW_OFFSET, RESERVED_FIELDS};
use anyhow::Result;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferscanConfig {
    #[serde(default)]
    pub specs: SpecPaths,
    #[serde(default)]
    pub sheets: SheetConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl OfferscanConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: OfferscanConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Check the configuration against the loaded specs
    pub fn validate(&self, labels: &LabelSpecs, columns: &ColumnSpecs) -> Result<(), ConfigError> {
        self.sheets.compile()?;
        if let Some(pattern) = &self.discovery.folder_pattern {
            compile_pattern("discovery.folder_pattern", pattern)?;
        }

        let mut seen = HashSet::new();
        for label in labels.iter() {
            if label.offset_up.unsigned_abs() >= MAX_ROW_OFFSET.unsigned_abs()
                || label.offset_right.unsigned_abs() >= MAX_COL_OFFSET.unsigned_abs()
            {
                return Err(ConfigError::OffsetOutOfRange {
                    name: label.name.clone(),
                    up: label.offset_up,
                    right: label.offset_right,
                });
            }
            check_field_name(&label.name, &mut seen)?;
        }
        for column in columns.iter() {
            check_field_name(&column.output, &mut seen)?;
        }

        for field in self
            .normalize
            .date_fields
            .iter()
            .chain(&self.normalize.numeric_fields)
        {
            if !seen.contains(field.as_str()) {
                tracing::warn!(field = %field, "normalized field is not produced by any spec");
            }
        }

        Ok(())
    }
}

fn check_field_name<'a>(name: &'a str, seen: &mut HashSet<&'a str>) -> Result<(), ConfigError> {
    if RESERVED_FIELDS.contains(&name) {
        return Err(ConfigError::ReservedField(name.to_string()));
    }
    if !seen.insert(name) {
        return Err(ConfigError::DuplicateField(name.to_string()));
    }
    Ok(())
}

pub(crate) fn compile_pattern(name: &str, pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::InvalidPattern {
            name: name.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

/// Locations of the JSON spec files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecPaths {
    pub labels: Option<PathBuf>,
    pub columns: Option<PathBuf>,
}

/// How the data sheet and the table sheet are picked
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Pattern searched in sheet names for the labeled sheet
    pub primary_pattern: String,
    /// Sheet name used when nothing matches `primary_pattern`
    pub primary_fallback: Option<String>,
    /// Pattern searched in sheet names for the table sheet
    pub table_pattern: String,
    /// Header row of the table sheet (1-based)
    pub table_header_row: u32,
    /// Prefer table sheets without pictures when several match
    pub skip_image_sheets: bool,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            primary_pattern: "ficha".to_string(),
            primary_fallback: Some("FICHA".to_string()),
            table_pattern: r"\b(?:SAP|^Oferta)\b".to_string(),
            table_header_row: 1,
            skip_image_sheets: true,
        }
    }
}

impl SheetConfig {
    pub(crate) fn compile(&self) -> Result<SheetRules, ConfigError> {
        Ok(SheetRules {
            primary: compile_pattern("sheets.primary_pattern", &self.primary_pattern)?,
            primary_fallback: self.primary_fallback.clone(),
            table: compile_pattern("sheets.table_pattern", &self.table_pattern)?,
            table_header_row: self.table_header_row.max(1),
            skip_image_sheets: self.skip_image_sheets,
        })
    }
}

/// Compiled form of [`SheetConfig`]
#[derive(Debug, Clone)]
pub(crate) struct SheetRules {
    pub primary: Regex,
    pub primary_fallback: Option<String>,
    pub table: Regex,
    pub table_header_row: u32,
    pub skip_image_sheets: bool,
}

/// Record clean-up settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Fields parsed as dates
    pub date_fields: Vec<String>,
    /// Fields whose text values are read as numbers
    pub numeric_fields: Vec<String>,
    /// Raw values replaced before anything else runs
    pub sentinels: Vec<SentinelRule>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            date_fields: vec!["offer_date".to_string()],
            numeric_fields: Vec::new(),
            sentinels: Vec::new(),
        }
    }
}

/// Replace `raw` in `field` (`"*"` for any field) with `replacement`,
/// or with null when no replacement is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelRule {
    pub field: String,
    pub raw: String,
    #[serde(default)]
    pub replacement: Option<SentinelValue>,
}

impl SentinelRule {
    pub fn applies_to(&self, field: &str) -> bool {
        self.field == "*" || self.field == field
    }
}

/// Replacement value of a sentinel rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SentinelValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&SentinelValue> for CellValue {
    fn from(value: &SentinelValue) -> Self {
        match value {
            SentinelValue::Bool(b) => CellValue::Bool(*b),
            SentinelValue::Int(i) => CellValue::Int(*i),
            SentinelValue::Float(f) => CellValue::Float(*f),
            SentinelValue::Text(s) => CellValue::Text(s.clone()),
        }
    }
}

/// Where the command line looks for workbooks when none are given
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub directory: Option<PathBuf>,
    /// Only first-level folders whose name matches are scanned
    pub folder_pattern: Option<String>,
    pub extensions: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            directory: None,
            folder_pattern: None,
            extensions: vec!["xlsx".to_string(), "xlsm".to_string()],
        }
    }
}
