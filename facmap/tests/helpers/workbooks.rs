//! Input spreadsheet fixtures

use facmap::models::columns;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

/// Name, locality, address and mechanic columns
pub fn facility_header() -> Vec<&'static str> {
    vec![
        columns::NAME,
        columns::LOCALITY,
        columns::ADDRESS,
        columns::KTO_MECHANIC,
    ]
}

/// Write `header` and `rows` as a CSV file
pub fn write_csv(dir: &Path, name: &str, header: &[&str], rows: &[&[&str]]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path).unwrap();
    writer.write_record(header).unwrap();
    for row in rows {
        writer.write_record(*row).unwrap();
    }
    writer.flush().unwrap();
    path
}

/// Write a workbook with one named sheet holding `header` and `rows`
pub fn write_xlsx(dir: &Path, name: &str, sheet: &str, header: &[&str], rows: &[&[&str]]) -> PathBuf {
    let path = dir.join(name);
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet).unwrap();
    for (col, title) in header.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet
                    .write_string(r as u32 + 1, col as u16, *value)
                    .unwrap();
            }
        }
    }
    workbook.save(&path).unwrap();
    path
}
