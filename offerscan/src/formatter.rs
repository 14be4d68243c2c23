//! Progress reporting and output sinks for extracted records

use anyhow::{Context, Result};
use colored::*;
use offerscan_core::{ExtractedRecord, ExtractionBatchResult, ExtractionObserver, ReadStatus};
use std::io::Write;
use std::path::Path;

/// Prints a line per file to stderr and any problem as soon as it happens
pub struct ProgressPrinter {
    show_progress: bool,
}

impl ProgressPrinter {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }
}

/// Counts by status, taken before any filtering of the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub warnings: usize,
    pub failures: usize,
}

impl Summary {
    pub fn of(batch: &ExtractionBatchResult) -> Self {
        Self {
            total: batch.len(),
            success: batch.count(ReadStatus::Success),
            warnings: batch.count(ReadStatus::Warning),
            failures: batch.count(ReadStatus::Fail),
        }
    }
}

impl ExtractionObserver for ProgressPrinter {
    fn on_file_start(&mut self, index: usize, total: usize, path: &Path) {
        if self.show_progress {
            eprintln!(
                "{} {}",
                format!("[{}/{}]", index, total).bright_black(),
                path.display()
            );
        }
    }

    fn on_record(&mut self, _index: usize, _total: usize, record: &ExtractedRecord) {
        let label = match record.read_status {
            ReadStatus::Success => return,
            ReadStatus::Warning => "WARN".yellow().bold(),
            ReadStatus::Fail => "FAIL".red().bold(),
        };
        eprintln!(
            "{} {}: {}",
            label,
            record.full_path,
            record.read_details.as_deref().unwrap_or("")
        );
    }
}

/// Records grouped per file, then a summary by status
pub fn write_human<W: Write>(
    out: &mut W,
    batch: &ExtractionBatchResult,
    summary: &Summary,
) -> Result<()> {
    for record in batch.iter() {
        let status = match record.read_status {
            ReadStatus::Success => "OK".green().bold(),
            ReadStatus::Warning => "WARN".yellow().bold(),
            ReadStatus::Fail => "FAIL".red().bold(),
        };
        writeln!(out, "{} {}", status, record.file_name.cyan().bold())?;
        writeln!(out, "  {}", record.full_path.bright_black())?;
        if let Some(details) = &record.read_details {
            writeln!(out, "  {}", details.italic())?;
        }
        for column in &batch.columns {
            match record.get(column) {
                Some(value) => writeln!(out, "  {}: {}", column.bold(), value)?,
                None => writeln!(out, "  {}: {}", column.bold(), "-".bright_black())?,
            }
        }
        writeln!(out)?;
    }

    writeln!(out, "{}", "Summary:".bold().underline())?;
    writeln!(out, "  {} {}", "Files:".bold(), summary.total)?;
    writeln!(out, "  {} {}", "Success:".green().bold(), summary.success)?;
    if summary.warnings > 0 {
        writeln!(out, "  {} {}", "Warnings:".yellow().bold(), summary.warnings)?;
    }
    if summary.failures > 0 {
        writeln!(out, "  {} {}", "Failed:".red().bold(), summary.failures)?;
    }
    Ok(())
}

/// Pretty JSON array with one object per record
pub fn write_json<W: Write>(out: &mut W, batch: &ExtractionBatchResult) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, &batch.rows()).context("Failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}

/// CSV with the batch header; lists are written as `a, b, c`
pub fn write_csv<W: Write>(out: &mut W, batch: &ExtractionBatchResult) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(batch.header())?;

    for record in batch.iter() {
        let mut row: Vec<String> = batch
            .columns
            .iter()
            .map(|column| record.get(column).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        row.push(record.full_path.clone());
        row.push(record.file_name.clone());
        row.push(record.read_status.to_string());
        row.push(record.read_details.clone().unwrap_or_default());
        writer.write_record(&row)?;
    }

    writer.flush().context("Failed to write CSV")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use offerscan_core::{CellValue, FieldValue};
    use std::collections::BTreeMap;

    fn batch() -> ExtractionBatchResult {
        let mut fields = BTreeMap::new();
        fields.insert(
            "client_name".to_string(),
            Some(FieldValue::Scalar(CellValue::Text("Inversiones Sur".into()))),
        );
        fields.insert(
            "unique_urs".to_string(),
            Some(FieldValue::List(vec![CellValue::Int(10), CellValue::Int(12)])),
        );
        let ok = ExtractedRecord {
            fields,
            full_path: "/offers/a.xlsx".into(),
            file_name: "a.xlsx".into(),
            read_status: ReadStatus::Success,
            read_details: None,
        };
        let failed = ExtractedRecord::failed(
            "/offers/b.xlsx",
            "b.xlsx",
            "cannot open workbook: bad zip",
            ["client_name", "unique_urs"],
        );
        ExtractionBatchResult {
            columns: vec!["client_name".into(), "unique_urs".into()],
            records: vec![ok, failed],
        }
    }

    #[test]
    fn test_csv_output() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &batch()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines[0],
            "client_name,unique_urs,full_path,file_name,read_status,read_details"
        );
        assert_eq!(lines[1], "Inversiones Sur,\"10, 12\",/offers/a.xlsx,a.xlsx,Success,");
        assert_eq!(
            lines[2],
            ",,/offers/b.xlsx,b.xlsx,Fail,cannot open workbook: bad zip"
        );
    }

    #[test]
    fn test_json_output() {
        let mut buf = Vec::new();
        write_json(&mut buf, &batch()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value[0]["unique_urs"], serde_json::json!([10, 12]));
        assert_eq!(value[1]["client_name"], serde_json::Value::Null);
        assert_eq!(value[1]["read_status"], "Fail");
    }

    #[test]
    fn test_summary_counts() {
        let summary = Summary::of(&batch());
        assert_eq!(
            summary,
            Summary {
                total: 2,
                success: 1,
                warnings: 0,
                failures: 1,
            }
        );
    }

    #[test]
    fn test_human_summary_counts_all_files() {
        let mut full = batch();
        let summary = Summary::of(&full);
        full.records.retain(|r| r.read_status != ReadStatus::Success);

        colored::control::set_override(false);
        let mut buf = Vec::new();
        write_human(&mut buf, &full, &summary).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("FAIL b.xlsx"));
        assert!(!text.contains("a.xlsx"));
        assert!(text.contains("Files: 2"));
        assert!(text.contains("Failed: 1"));
    }
}
