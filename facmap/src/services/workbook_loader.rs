//! Facility spreadsheet loader
//!
//! Reads `.xlsx` / `.xlsm` / `.xls` / `.ods` through calamine and `.csv`
//! through the csv crate. The first row holds the column headers.

use crate::error::{FacmapError, FacmapResult};
use crate::models::FacilityRecord;
use calamine::{open_workbook_auto, Data, Reader};
use facmap_common::text::normalize_header;
use std::path::Path;
use tracing::{debug, info};

/// Which worksheet to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// 0-based position
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl SheetSelector {
    /// Parse `--sheet`: a number selects by position, anything else by name
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value.parse::<usize>() {
            Ok(index) => SheetSelector::Index(index),
            Err(_) if value.is_empty() => SheetSelector::default(),
            Err(_) => SheetSelector::Name(value.to_string()),
        }
    }
}

/// Load every non-empty data row of the sheet
pub fn load_records(path: &Path, sheet: &SheetSelector) -> FacmapResult<Vec<FacilityRecord>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let rows = if is_csv {
        read_csv(path)?
    } else {
        read_sheet(path, sheet)?
    };

    let records = records_from_rows(rows);
    info!(rows = records.len(), "Loaded facility records from {}", path.display());
    Ok(records)
}

fn read_sheet(path: &Path, sheet: &SheetSelector) -> FacmapResult<Vec<Vec<String>>> {
    let workbook_error = |e: calamine::Error| FacmapError::Workbook(format!("{}: {}", path.display(), e));

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let names = workbook.sheet_names();

    let range = match sheet {
        // A sheet literally named "1" wins over position 1
        SheetSelector::Index(index) if names.iter().any(|n| *n == index.to_string()) => {
            workbook.worksheet_range(&index.to_string())
        }
        SheetSelector::Index(index) => workbook.worksheet_range_at(*index).ok_or_else(|| {
            FacmapError::Workbook(format!(
                "{}: no sheet at index {} ({} sheets)",
                path.display(),
                index,
                names.len()
            ))
        })?,
        SheetSelector::Name(name) => {
            if !names.iter().any(|n| n == name) {
                return Err(FacmapError::Workbook(format!(
                    "{}: no sheet named '{}' (available: {})",
                    path.display(),
                    name,
                    names.join(", ")
                )));
            }
            workbook.worksheet_range(name)
        }
    }
    .map_err(workbook_error)?;

    debug!(rows = range.height(), columns = range.width(), "Worksheet range");

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn read_csv(path: &Path) -> FacmapResult<Vec<Vec<String>>> {
    let csv_error = |e: csv::Error| FacmapError::Workbook(format!("{}: {}", path.display(), e));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(|field| field.trim().to_string()).collect());
    }
    Ok(rows)
}

/// Render one cell the way it reads in the spreadsheet
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        // House numbers and postal codes come back as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// First row is the header; fully empty rows are dropped
fn records_from_rows(rows: Vec<Vec<String>>) -> Vec<FacilityRecord> {
    let mut rows = rows.into_iter();
    let Some(header_row) = rows.next() else {
        return Vec::new();
    };

    let headers: Vec<String> = header_row
        .iter()
        .map(|h| normalize_header(h.trim_start_matches('\u{feff}')))
        .collect();

    rows.enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|(index, cells)| {
            FacilityRecord::from_pairs(
                index + 1,
                headers
                    .iter()
                    .zip(cells)
                    .filter(|(header, _)| !header.is_empty())
                    .map(|(header, value)| (header.clone(), value)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::columns;
    use tempfile::TempDir;

    #[test]
    fn test_sheet_selector_parse() {
        assert_eq!(SheetSelector::parse("0"), SheetSelector::Index(0));
        assert_eq!(SheetSelector::parse(" 2 "), SheetSelector::Index(2));
        assert_eq!(SheetSelector::parse("Лист1"), SheetSelector::Name("Лист1".to_string()));
        assert_eq!(SheetSelector::parse(""), SheetSelector::Index(0));
    }

    #[test]
    fn test_cell_text_formats_numbers() {
        assert_eq!(cell_text(&Data::Float(5.0)), "5");
        assert_eq!(cell_text(&Data::Float(410012.0)), "410012");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(17)), "17");
        assert_eq!(cell_text(&Data::String("  Пенза ".to_string())), "Пенза");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_records_from_rows_normalizes_headers() {
        let rows = vec![
            vec!["Населенный\u{00A0}пункт".to_string(), "Инженер\u{2011}энергетик".to_string()],
            vec!["Пенза".to_string(), "Петров".to_string()],
            vec![String::new(), "  ".to_string()],
            vec!["Саратов".to_string()],
        ];
        let records = records_from_rows(rows);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].locality(), "Пенза");
        assert_eq!(records[0].get(columns::POWER_ENGINEER), "Петров");
        assert_eq!(records[0].row, 1);
        // Short row: missing trailing cells read as empty
        assert_eq!(records[1].locality(), "Саратов");
        assert_eq!(records[1].get(columns::POWER_ENGINEER), "");
        assert_eq!(records[1].row, 3);
    }

    #[test]
    fn test_load_csv() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("map.csv");
        std::fs::write(
            &path,
            "\u{feff}Наименование,Населенный пункт,Адрес,Механик КТО\n\
             Магазин 1,Саратов,\"ул. Московская, 5\",Иванов\n\
             ,,,\n\
             Магазин 2,Пенза,,\n",
        )
        .unwrap();

        let records = load_records(&path, &SheetSelector::default()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name(), "Магазин 1");
        assert_eq!(records[0].address(), "ул. Московская, 5");
        assert_eq!(records[0].get(columns::KTO_MECHANIC), "Иванов");
        assert_eq!(records[1].address(), "");
    }

    #[test]
    fn test_load_xlsx_by_name_and_index() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("map.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let first = workbook.add_worksheet();
        first.set_name("Пусто").unwrap();
        let second = workbook.add_worksheet();
        second.set_name("ТТ").unwrap();
        second.write_string(0, 0, columns::NAME).unwrap();
        second.write_string(0, 1, columns::ADDRESS).unwrap();
        second.write_string(1, 0, "Магазин 7").unwrap();
        second.write_string(1, 1, "ул. Тельмана, д. 1").unwrap();
        second.write_number(2, 0, 12.0).unwrap();
        workbook.save(&path).unwrap();

        let by_name = load_records(&path, &SheetSelector::Name("ТТ".to_string())).unwrap();
        let by_index = load_records(&path, &SheetSelector::Index(1)).unwrap();

        assert_eq!(by_name, by_index);
        assert_eq!(by_name.len(), 2);
        assert_eq!(by_name[0].address(), "ул. Тельмана, д. 1");
        assert_eq!(by_name[1].name(), "12");
    }

    #[test]
    fn test_unknown_sheet_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("map.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        workbook.add_worksheet().write_string(0, 0, columns::NAME).unwrap();
        workbook.save(&path).unwrap();

        let result = load_records(&path, &SheetSelector::Name("Нет такого".to_string()));
        assert!(matches!(result, Err(FacmapError::Workbook(_))));

        let result = load_records(&path, &SheetSelector::Index(5));
        assert!(matches!(result, Err(FacmapError::Workbook(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_records(Path::new("/nonexistent/map.xlsx"), &SheetSelector::default());
        assert!(matches!(result, Err(FacmapError::Workbook(_))));
    }
}
