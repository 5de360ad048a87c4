//! Data models for facmap
//!
//! - `FacilityRecord`: one spreadsheet row
//! - `columns`: header names of the facility spreadsheet

pub mod columns;
pub mod facility;

pub use facility::FacilityRecord;
