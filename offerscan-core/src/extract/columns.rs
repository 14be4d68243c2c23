//! Table column extractor: distinct values of one column under a header

use crate::error::ExtractError;
use crate::reader::{CellValue, SheetSnapshot};
use crate::record::FieldValue;

/// Collect the distinct values of the column titled `column_name`.
///
/// The header is read from `header_row`; every later row is data. Digit-only
/// text is read as an integer without leading zeros, and empty cells are
/// ignored. One distinct value collapses to a scalar, several come back as
/// a sorted list, and none gives `Ok(None)`.
pub fn extract_unique_column_values(
    sheet: &SheetSnapshot,
    header_row: u32,
    column_name: &str,
) -> Result<Option<FieldValue>, ExtractError> {
    let col = sheet
        .row(header_row)
        .find(|(_, value)| value.as_text() == Some(column_name))
        .map(|(col, _)| col)
        .ok_or_else(|| ExtractError::ColumnNotFound(column_name.to_string()))?;

    let last_row = sheet.last_row().unwrap_or(header_row);
    let mut distinct: Vec<CellValue> = Vec::new();

    for row in header_row.saturating_add(1)..=last_row {
        let Some(value) = sheet.get(row, col) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let value = value.clone().coerce_digits();
        if !distinct.iter().any(|seen| seen.same_value(&value)) {
            distinct.push(value);
        }
    }

    match distinct.len() {
        0 => Ok(None),
        1 => Ok(distinct.pop().map(|v| FieldValue::Scalar(v.coerce_digits()))),
        _ => sort_values(column_name, distinct).map(|values| Some(FieldValue::List(values))),
    }
}

fn sort_values(column: &str, mut values: Vec<CellValue>) -> Result<Vec<CellValue>, ExtractError> {
    // Every pair must be comparable before sorting, or the order is meaningless
    let first = &values[0];
    for value in &values {
        if first.try_cmp(value).is_none() {
            return Err(ExtractError::IncomparableValues {
                column: column.to_string(),
                left: first.kind().as_str(),
                right: value.kind().as_str(),
            });
        }
    }

    values.sort_by(|a, b| a.try_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(values)
}
