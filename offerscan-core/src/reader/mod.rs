//! Excel/ODS file reader using calamine

use crate::error::ExtractError;
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub mod workbook;
pub mod xml_parser;

pub use workbook::{CellValue, SheetSnapshot, ValueKind};

/// An opened workbook.
///
/// Holds the calamine reader (and with it the OS file handle) until dropped.
/// The extractor keeps exactly one alive at a time.
pub struct WorkbookHandle {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
    sheet_names: Vec<String>,
    image_sheets: Option<HashSet<String>>,
}

impl WorkbookHandle {
    /// Open a workbook from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let sheets: Sheets<_> =
            open_workbook_auto(path).map_err(|e| ExtractError::FileOpen(e.to_string()))?;
        let sheet_names = sheets.sheet_names();

        Ok(Self {
            path: path.to_path_buf(),
            sheets,
            sheet_names,
            image_sheets: None,
        })
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names.iter().any(|s| s == name)
    }

    /// Read one worksheet into a snapshot
    pub fn snapshot(&mut self, name: &str) -> Result<SheetSnapshot, ExtractError> {
        if !self.has_sheet(name) {
            return Err(ExtractError::MissingSheet(name.to_string()));
        }
        let range = self
            .sheets
            .worksheet_range(name)
            .map_err(|e| ExtractError::SheetRead {
                sheet: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(parse_sheet(name, &range))
    }

    /// Whether the named sheet carries an embedded picture.
    ///
    /// Only OOXML packages are inspected. For other formats, or when the
    /// package cannot be read, no sheet is reported as having images.
    pub fn sheet_has_images(&mut self, name: &str) -> bool {
        if self.image_sheets.is_none() {
            let found = match xml_parser::sheets_with_images_in_file(&self.path) {
                Ok(found) => found,
                Err(e) => {
                    tracing::debug!(path = %self.path.display(), error = %e, "image lookup skipped");
                    HashSet::new()
                }
            };
            self.image_sheets = Some(found);
        }
        self.image_sheets
            .as_ref()
            .is_some_and(|sheets| sheets.contains(name))
    }
}

fn parse_sheet(name: &str, range: &Range<Data>) -> SheetSnapshot {
    let mut snapshot = SheetSnapshot::new(name);
    // calamine positions are 0-based and relative to the range start
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    for (rel_row, rel_col, data) in range.used_cells() {
        let value = parse_cell_value(data);
        let row = start_row + rel_row as u32 + 1;
        let col = start_col + rel_col as u32 + 1;
        snapshot.insert(row, col, value);
    }

    snapshot
}

pub(crate) fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                return CellValue::Float(dt.as_f64());
            }
            match dt.as_datetime() {
                Some(datetime) => CellValue::DateTime(datetime),
                None => CellValue::Float(dt.as_f64()),
            }
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn parse_iso_datetime(s: &str) -> CellValue {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return CellValue::DateTime(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return CellValue::Date(d);
    }
    CellValue::Text(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    #[test]
    fn test_parse_cell_value_mapping() {
        assert_eq!(
            parse_cell_value(&Data::String("Precio".into())),
            CellValue::Text("Precio".into())
        );
        assert_eq!(parse_cell_value(&Data::Int(3)), CellValue::Int(3));
        assert_eq!(parse_cell_value(&Data::Float(2.5)), CellValue::Float(2.5));
        assert_eq!(
            parse_cell_value(&Data::Error(CellErrorType::NA)),
            CellValue::Text("#N/A".into())
        );
        assert_eq!(
            parse_cell_value(&Data::DateTimeIso("2023-06-15".into())),
            CellValue::Date(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap())
        );
        assert_eq!(
            parse_cell_value(&Data::DateTimeIso("mañana".into())),
            CellValue::Text("mañana".into())
        );
    }

    #[test]
    fn test_parse_sheet_offsets_by_range_start() {
        let mut range = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("Total:".into()));
        range.set_value((2, 2), Data::Float(42.0));
        range.set_value((3, 1), Data::String(String::new()));

        let snapshot = parse_sheet("Ficha", &range);

        assert_eq!(snapshot.get(3, 2), Some(&CellValue::Text("Total:".into())));
        assert_eq!(snapshot.get(3, 3), Some(&CellValue::Float(42.0)));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_open_rejects_non_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.xlsx");
        std::fs::write(&path, [0u8, 159, 146, 150, 1, 2, 3]).unwrap();

        let err = WorkbookHandle::open(&path).err().unwrap();
        assert!(matches!(err, ExtractError::FileOpen(_)));
    }

    #[test]
    fn test_unreadable_sheet_is_a_sheet_error() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_sheet_part.xlsx");
        let mut zip = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        let options = SimpleFileOptions::default();

        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Ficha" sheetId="1" r:id="rId1"/></sheets></workbook>"#)
            .unwrap();
        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#)
            .unwrap();
        // The sheet part itself is missing from the package
        zip.finish().unwrap();

        let mut workbook = WorkbookHandle::open(&path).unwrap();
        assert_eq!(workbook.sheet_names(), ["Ficha".to_string()]);

        let err = workbook.snapshot("Ficha").unwrap_err();
        assert!(matches!(err, ExtractError::SheetRead { ref sheet, .. } if sheet == "Ficha"));
        assert!(!err.to_string().contains("cannot open workbook"));

        assert!(matches!(
            workbook.snapshot("Notas"),
            Err(ExtractError::MissingSheet(_))
        ));
    }
}
