//! Record normalizer: sentinel repair, date recovery, numeric coercion

use super::dates::{date_from_path_digits, date_from_path_segments, parse_date_value};
use super::numbers::parse_number_text;
use crate::config::{NormalizeConfig, SentinelRule};
use crate::reader::CellValue;
use crate::record::{ExtractedRecord, FieldValue, ReadStatus};
use std::path::Path;

/// Applies the configured clean-up passes to one record at a time
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    /// Return the repaired record.
    ///
    /// Never fails: a field that cannot be repaired is left as it is (or
    /// cleared, for dates) and a note is added to the record's details.
    /// Failed records pass through untouched.
    pub fn normalize(&self, mut record: ExtractedRecord) -> ExtractedRecord {
        if record.read_status == ReadStatus::Fail {
            return record;
        }

        self.repair_sentinels(&mut record);

        for field in &self.config.date_fields {
            if let Some(note) = normalize_date(&mut record, field) {
                tracing::warn!(file = %record.full_path, field = %field, "{}", note);
                record.add_warning(note);
            }
        }

        for field in &self.config.numeric_fields {
            if let Some(note) = normalize_number(&mut record, field) {
                tracing::warn!(file = %record.full_path, field = %field, "{}", note);
                record.add_warning(note);
            }
        }

        record
    }

    fn repair_sentinels(&self, record: &mut ExtractedRecord) {
        if self.config.sentinels.is_empty() {
            return;
        }
        for (field, slot) in record.fields.iter_mut() {
            let Some(FieldValue::Scalar(value)) = slot else {
                continue;
            };
            let Some(rule) = find_sentinel(&self.config.sentinels, field, value) else {
                continue;
            };
            *slot = rule
                .replacement
                .as_ref()
                .map(|v| FieldValue::Scalar(CellValue::from(v)));
        }
    }
}

fn find_sentinel<'a>(
    rules: &'a [SentinelRule],
    field: &str,
    value: &CellValue,
) -> Option<&'a SentinelRule> {
    let text = value.to_string();
    let text = text.trim();
    rules
        .iter()
        .find(|rule| rule.applies_to(field) && rule.raw.trim() == text)
}

/// Walk the date fallback chain for one field. Returns a note on failure.
fn normalize_date(record: &mut ExtractedRecord, field: &str) -> Option<String> {
    let raw = match record.fields.get(field) {
        Some(Some(FieldValue::Scalar(value))) => value.clone(),
        Some(Some(FieldValue::List(_))) => {
            record.fields.insert(field.to_string(), None);
            return Some(format!("{}: several values, cannot read as a date", field));
        }
        _ => return None,
    };

    if let Some(date) = parse_date_value(&raw) {
        record
            .fields
            .insert(field.to_string(), Some(FieldValue::Scalar(date)));
        return None;
    }

    let path = Path::new(&record.full_path);
    let recovered = date_from_path_digits(path).or_else(|| date_from_path_segments(path));
    match recovered {
        Some(date) => {
            tracing::debug!(file = %record.full_path, field, %date, "date taken from path");
            record
                .fields
                .insert(field.to_string(), Some(FieldValue::Scalar(CellValue::Date(date))));
            None
        }
        None => {
            record.fields.insert(field.to_string(), None);
            Some(format!("{}: could not read '{}' as a date", field, raw))
        }
    }
}

/// Coerce a text amount into a float. Returns a note on failure.
fn normalize_number(record: &mut ExtractedRecord, field: &str) -> Option<String> {
    let Some(Some(FieldValue::Scalar(CellValue::Text(text)))) = record.fields.get(field) else {
        return None;
    };

    match parse_number_text(text) {
        Some(number) => {
            record.fields.insert(
                field.to_string(),
                Some(FieldValue::Scalar(CellValue::Float(number))),
            );
            None
        }
        None => Some(format!("{}: could not read '{}' as a number", field, text)),
    }
}
