//! Test Helper Utilities
//!
//! Shared utilities for the facmap integration tests

#![allow(dead_code)]

pub mod backends;
pub mod log_capture;
pub mod workbooks;

pub use backends::{FailingBackend, ScriptedBackend};
pub use log_capture::LogCapture;
pub use workbooks::{facility_header, write_csv, write_xlsx};
