//! Cell values and sheet snapshots

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Cell value types
///
/// The closed set of shapes a cell can take once it leaves the workbook
/// reader. Everything downstream matches on this instead of guessing.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Ordering class used when sorting distinct values.
///
/// Values of different classes cannot be ordered against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Empty,
    Text,
    Number,
    Date,
    DateTime,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Empty => "empty",
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Date => "date",
            ValueKind::DateTime => "datetime",
        }
    }
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Get the text if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of int, float and bool cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            CellValue::Empty => ValueKind::Empty,
            CellValue::Text(_) => ValueKind::Text,
            CellValue::Int(_) | CellValue::Float(_) | CellValue::Bool(_) => ValueKind::Number,
            CellValue::Date(_) => ValueKind::Date,
            CellValue::DateTime(_) => ValueKind::DateTime,
        }
    }

    /// Turn a text made only of ASCII digits into an integer.
    ///
    /// Leading zeros go away (`"007"` becomes `7`, `"000"` becomes `0`).
    /// Digit strings too long for an `i64` are returned unchanged.
    pub fn coerce_digits(self) -> CellValue {
        match self {
            CellValue::Text(s) if is_ascii_digits(&s) => {
                let stripped = s.trim_start_matches('0');
                if stripped.is_empty() {
                    return CellValue::Int(0);
                }
                match stripped.parse::<i64>() {
                    Ok(n) => CellValue::Int(n),
                    Err(_) => CellValue::Text(s),
                }
            }
            other => other,
        }
    }

    /// Equality used for deduplication: numbers compare across kinds,
    /// so `7`, `7.0` and `"007"` (once coerced) are the same value.
    pub fn same_value(&self, other: &CellValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self == other,
            _ => false,
        }
    }

    /// Order two values of the same kind. Returns `None` for mixed kinds
    /// and for NaN.
    pub fn try_cmp(&self, other: &CellValue) -> Option<Ordering> {
        match (self, other) {
            (CellValue::Text(a), CellValue::Text(b)) => Some(a.cmp(b)),
            (CellValue::Date(a), CellValue::Date(b)) => Some(a.cmp(b)),
            (CellValue::DateTime(a), CellValue::DateTime(b)) => Some(a.cmp(b)),
            (CellValue::Int(a), CellValue::Int(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

pub(crate) fn is_ascii_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", format_float(*v)),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => {
                if dt.time() == NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_none(),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            CellValue::Float(_) => serializer.serialize_none(),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

/// Immutable sparse view of one worksheet.
///
/// Keys are 1-based `(row, column)` pairs, like the addresses a user sees in
/// a spreadsheet. Only non-empty cells are stored, so a missing key is an
/// empty cell. Iteration is row-major: rows top to bottom, and within a row
/// columns left to right. Label matching relies on this order for its
/// first-match-wins tie-break.
#[derive(Debug, Clone, Default)]
pub struct SheetSnapshot {
    pub name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
}

impl SheetSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Build a snapshot from `(row, col, value)` triples, dropping empties
    pub fn from_cells<I>(name: impl Into<String>, cells: I) -> Self
    where
        I: IntoIterator<Item = (u32, u32, CellValue)>,
    {
        let mut snapshot = Self::new(name);
        for (row, col, value) in cells {
            snapshot.insert(row, col, value);
        }
        snapshot
    }

    pub(crate) fn insert(&mut self, row: u32, col: u32, value: CellValue) {
        if row == 0 || col == 0 || value.is_empty() {
            return;
        }
        self.cells.insert((row, col), value);
    }

    /// Get a cell at the given 1-based position
    pub fn get(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// All populated cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), &CellValue)> {
        self.cells.iter().map(|(pos, value)| (*pos, value))
    }

    /// Populated cells of one row, left to right
    pub fn row(&self, row: u32) -> impl Iterator<Item = (u32, &CellValue)> {
        self.cells
            .range((row, 0)..=(row, u32::MAX))
            .map(|((_, col), value)| (*col, value))
    }

    /// Last row holding any data
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().next_back().map(|(row, _)| *row)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_digits() {
        assert_eq!(CellValue::Text("007".into()).coerce_digits(), CellValue::Int(7));
        assert_eq!(CellValue::Text("000".into()).coerce_digits(), CellValue::Int(0));
        assert_eq!(
            CellValue::Text("12a".into()).coerce_digits(),
            CellValue::Text("12a".into())
        );
        assert_eq!(
            CellValue::Text(" 12".into()).coerce_digits(),
            CellValue::Text(" 12".into())
        );
        let huge = "123456789012345678901234567890".to_string();
        assert_eq!(
            CellValue::Text(huge.clone()).coerce_digits(),
            CellValue::Text(huge)
        );
    }

    #[test]
    fn test_same_value_across_numeric_kinds() {
        assert!(CellValue::Int(7).same_value(&CellValue::Float(7.0)));
        assert!(!CellValue::Int(7).same_value(&CellValue::Text("7".into())));
        assert!(CellValue::Text("a".into()).same_value(&CellValue::Text("a".into())));
    }

    #[test]
    fn test_try_cmp_mixed_kinds() {
        assert_eq!(
            CellValue::Int(1).try_cmp(&CellValue::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(CellValue::Int(1).try_cmp(&CellValue::Text("a".into())), None);
        assert_eq!(CellValue::Float(f64::NAN).try_cmp(&CellValue::Int(1)), None);
    }

    #[test]
    fn test_snapshot_row_major_order() {
        let snapshot = SheetSnapshot::from_cells(
            "Ficha",
            vec![
                (2, 1, CellValue::Text("b".into())),
                (1, 3, CellValue::Text("a3".into())),
                (1, 1, CellValue::Text("a1".into())),
                (3, 1, CellValue::Text("   ".into())),
                (3, 2, CellValue::Empty),
            ],
        );

        let order: Vec<_> = snapshot.iter().map(|(pos, _)| pos).collect();
        assert_eq!(order, vec![(1, 1), (1, 3), (2, 1)]);
        assert_eq!(snapshot.last_row(), Some(2));
        assert_eq!(snapshot.row(1).count(), 2);
        assert!(snapshot.get(3, 1).is_none());
    }

    #[test]
    fn test_display_values() {
        assert_eq!(CellValue::Float(42.0).to_string(), "42");
        assert_eq!(CellValue::Float(1.5).to_string(), "1.5");
        let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
        assert_eq!(CellValue::Date(date).to_string(), "2023-06-15");
        assert_eq!(
            CellValue::DateTime(date.and_hms_opt(0, 0, 0).unwrap()).to_string(),
            "2023-06-15"
        );
    }
}
