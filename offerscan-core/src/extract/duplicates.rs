//! Near-duplicate detection across the records of a batch

use crate::record::{ExtractedRecord, ReadStatus};
use std::collections::HashMap;
use std::path::Path;

const COPY_SUFFIXES: [&str; 3] = [" - copia", " - copy", " copia"];
const COPY_PREFIXES: [&str; 2] = ["copia de ", "copy of "];

/// Flags records whose file is a near copy of an earlier one.
///
/// Two paths are near copies when they share a directory and their file
/// names differ only by case, spacing, or copy markers such as `" (1)"` or
/// `" - copia"`. The first path seen for each canonical name is remembered
/// and left untouched; later ones get a `Warning` naming it. Failed records
/// are ignored. No record is removed.
#[derive(Debug, Default)]
pub struct DuplicateTracker {
    first_seen: HashMap<String, String>,
}

impl DuplicateTracker {
    pub fn check(&mut self, record: &mut ExtractedRecord) {
        if record.read_status == ReadStatus::Fail {
            return;
        }
        let key = duplicate_key(Path::new(&record.full_path));
        match self.first_seen.get(&key) {
            Some(original) => {
                tracing::warn!(file = %record.full_path, original = %original, "near-duplicate file");
                record.add_warning(format!("near-duplicate of {}", original));
            }
            None => {
                self.first_seen.insert(key, record.full_path.clone());
            }
        }
    }
}

/// Directory plus a canonical form of the file name
pub(crate) fn duplicate_key(path: &Path) -> String {
    let dir = path
        .parent()
        .map(|p| p.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    format!("{}/{}.{}", dir, canonical_stem(&stem), ext)
}

fn canonical_stem(stem: &str) -> String {
    let mut current = collapse_spaces(stem);
    loop {
        let next = strip_copy_marker(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_copy_marker(stem: &str) -> String {
    for prefix in COPY_PREFIXES {
        if let Some(rest) = stem.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    for suffix in COPY_SUFFIXES {
        if let Some(rest) = stem.strip_suffix(suffix) {
            return rest.trim().to_string();
        }
    }
    // " (1)", "(2)"
    if let Some(rest) = stem.strip_suffix(')') {
        if let Some((head, counter)) = rest.rsplit_once('(') {
            if !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit()) {
                return head.trim().to_string();
            }
        }
    }
    stem.to_string()
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn check_all(records: &mut [ExtractedRecord]) {
        let mut tracker = DuplicateTracker::default();
        for record in records.iter_mut() {
            tracker.check(record);
        }
    }

    fn record(path: &str, status: ReadStatus) -> ExtractedRecord {
        ExtractedRecord {
            fields: BTreeMap::new(),
            full_path: path.to_string(),
            file_name: Path::new(path)
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            read_status: status,
            read_details: None,
        }
    }

    #[test]
    fn test_copy_markers_collapse() {
        let base = duplicate_key(Path::new("/a/Oferta X.xlsx"));
        assert_eq!(duplicate_key(Path::new("/a/Oferta X (1).xlsx")), base);
        assert_eq!(duplicate_key(Path::new("/a/oferta  x - copia.XLSX")), base);
        assert_eq!(duplicate_key(Path::new("/a/Copia de Oferta X (2).xlsx")), base);
        assert_eq!(duplicate_key(Path::new("/a/Copy of Oferta X.xlsx")), base);
        assert_ne!(duplicate_key(Path::new("/b/Oferta X.xlsx")), base);
        assert_ne!(duplicate_key(Path::new("/a/Oferta Y.xlsx")), base);
        assert_ne!(duplicate_key(Path::new("/a/Oferta X 2.xlsx")), base);
    }

    #[test]
    fn test_later_copy_becomes_warning() {
        let mut records = vec![
            record("/a/Oferta X.xlsx", ReadStatus::Success),
            record("/a/Oferta X (1).xlsx", ReadStatus::Success),
            record("/a/Oferta Z.xlsx", ReadStatus::Success),
        ];
        check_all(&mut records);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].read_status, ReadStatus::Success);
        assert_eq!(records[1].read_status, ReadStatus::Warning);
        assert!(records[1]
            .read_details
            .as_deref()
            .unwrap()
            .contains("/a/Oferta X.xlsx"));
        assert_eq!(records[2].read_status, ReadStatus::Success);
    }

    #[test]
    fn test_failed_records_are_ignored() {
        let mut records = vec![
            record("/a/Oferta X.xlsx", ReadStatus::Fail),
            record("/a/Oferta X (1).xlsx", ReadStatus::Success),
        ];
        check_all(&mut records);
        assert_eq!(records[0].read_status, ReadStatus::Fail);
        assert_eq!(records[1].read_status, ReadStatus::Success);
    }
}
