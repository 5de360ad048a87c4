//! Unresolved-address report
//!
//! Every row that produced no marker is listed in a one-column spreadsheet
//! for manual correction. `.csv` paths get CSV, anything else gets `.xlsx`.

use crate::error::{FacmapError, FacmapResult};
use crate::models::FacilityRecord;
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::{info, warn};

/// Report line for a row whose address cell is empty
pub const EMPTY_ADDRESS_PLACEHOLDER: &str = "<пустой адрес>";
pub const DEFAULT_REPORT_COLUMN: &str = "Адрес";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportFormat {
    Xlsx,
    Csv,
}

impl ReportFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ReportFormat::Csv,
            _ => ReportFormat::Xlsx,
        }
    }
}

/// Unresolved addresses in row order
#[derive(Debug, Clone, PartialEq)]
pub struct MissReport {
    column: String,
    entries: Vec<String>,
}

impl Default for MissReport {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_COLUMN)
    }
}

impl MissReport {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            entries: Vec::new(),
        }
    }

    /// Add a row that could not be placed on the map
    pub fn record(&mut self, record: &FacilityRecord) {
        let entry = if record.address().is_empty() {
            EMPTY_ADDRESS_PLACEHOLDER.to_string()
        } else {
            record.display_address()
        };
        warn!(row = record.row, "Not resolved: {}", entry);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the report; returns `false` (and writes nothing) when empty
    pub fn write(&self, path: &Path) -> FacmapResult<bool> {
        if self.entries.is_empty() {
            info!("All addresses resolved, no report written");
            return Ok(false);
        }

        let bytes = match ReportFormat::for_path(path) {
            ReportFormat::Xlsx => self.to_xlsx()?,
            ReportFormat::Csv => self.to_csv()?,
        };
        facmap_common::fs::ensure_parent_dir(path)?;
        facmap_common::fs::write_atomic(path, &bytes)?;

        info!(
            misses = self.entries.len(),
            "Unresolved addresses written to {}",
            path.display()
        );
        Ok(true)
    }

    fn to_xlsx(&self) -> FacmapResult<Vec<u8>> {
        let report_error = |e: rust_xlsxwriter::XlsxError| FacmapError::Report(e.to_string());

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, &self.column).map_err(report_error)?;
        for (i, entry) in self.entries.iter().enumerate() {
            let row = u32::try_from(i + 1)
                .map_err(|_| FacmapError::Report("too many rows".to_string()))?;
            worksheet.write_string(row, 0, entry).map_err(report_error)?;
        }
        worksheet.set_column_width(0, 80).map_err(report_error)?;

        workbook.save_to_buffer().map_err(report_error)
    }

    fn to_csv(&self) -> FacmapResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([self.column.as_str()])
            .map_err(|e| FacmapError::Report(e.to_string()))?;
        for entry in &self.entries {
            writer
                .write_record([entry.as_str()])
                .map_err(|e| FacmapError::Report(e.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| FacmapError::Report(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::columns;
    use calamine::{open_workbook_auto, Data, Reader};
    use tempfile::TempDir;

    fn row(row: usize, locality: &str, address: &str) -> FacilityRecord {
        FacilityRecord::from_pairs(row, [(columns::LOCALITY, locality), (columns::ADDRESS, address)])
    }

    fn sample() -> MissReport {
        let mut report = MissReport::default();
        report.record(&row(1, "Пенза", ""));
        report.record(&row(2, "Энгельс", "ул. Тельмана, 1"));
        report.record(&row(3, "", "ул. Чапаева, 10"));
        report
    }

    #[test]
    fn test_entries() {
        assert_eq!(
            sample().entries(),
            &[
                EMPTY_ADDRESS_PLACEHOLDER.to_string(),
                "Энгельс, ул. Тельмана, 1".to_string(),
                "ул. Чапаева, 10".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_report_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missed.xlsx");

        assert!(!MissReport::default().write(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_csv() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missed.csv");

        assert!(sample().write(&path).unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Адрес");
        assert_eq!(lines[1], "<пустой адрес>");
        assert_eq!(lines[2], "\"Энгельс, ул. Тельмана, 1\"");
    }

    #[test]
    fn test_write_xlsx() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missed.xlsx");

        assert!(sample().write(&path).unwrap());

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let cells: Vec<String> = range
            .rows()
            .map(|r| match &r[0] {
                Data::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        assert_eq!(
            cells,
            vec!["Адрес", "<пустой адрес>", "Энгельс, ул. Тельмана, 1", "ул. Чапаева, 10"]
        );
    }
}
