//! Facility record: one row of the input spreadsheet

use super::columns;
use std::collections::HashMap;

/// One facility row
///
/// Values are kept as trimmed strings keyed by the normalized column header.
/// A column absent from the sheet reads as the empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacilityRecord {
    /// 1-based data row number (header excluded), for log messages
    pub row: usize,
    fields: HashMap<String, String>,
}

impl FacilityRecord {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            fields: HashMap::new(),
        }
    }

    /// Build a record from `(column, value)` pairs
    pub fn from_pairs<I, K, V>(row: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new(row);
        for (column, value) in pairs {
            record.set(column, value);
        }
        record
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into().trim().to_string());
    }

    /// Value of `column`, empty when the column is missing
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.get(columns::NAME)
    }

    pub fn locality(&self) -> &str {
        self.get(columns::LOCALITY)
    }

    pub fn address(&self) -> &str {
        self.get(columns::ADDRESS)
    }

    /// Address as listed in the unresolved report
    pub fn display_address(&self) -> String {
        let locality = self.locality();
        if locality.is_empty() {
            self.address().to_string()
        } else {
            format!("{}, {}", locality, self.address())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_reads_empty() {
        let record = FacilityRecord::from_pairs(1, [(columns::NAME, "Магазин 12")]);
        assert_eq!(record.name(), "Магазин 12");
        assert_eq!(record.address(), "");
        assert_eq!(record.get("Несуществующая колонка"), "");
    }

    #[test]
    fn test_values_are_trimmed() {
        let record = FacilityRecord::from_pairs(1, [(columns::ADDRESS, "  ул. Московская, 5 ")]);
        assert_eq!(record.address(), "ул. Московская, 5");
    }

    #[test]
    fn test_display_address_prefixes_locality() {
        let with_locality = FacilityRecord::from_pairs(
            3,
            [(columns::LOCALITY, "Энгельс"), (columns::ADDRESS, "ул. Тельмана, 1")],
        );
        assert_eq!(with_locality.display_address(), "Энгельс, ул. Тельмана, 1");

        let without_locality = FacilityRecord::from_pairs(4, [(columns::ADDRESS, "ул. Тельмана, 1")]);
        assert_eq!(without_locality.display_address(), "ул. Тельмана, 1");
    }
}
