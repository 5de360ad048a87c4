//! # facmap Common Library
//!
//! Shared code for the facmap crates:
//! - Error types
//! - TOML configuration schema and loading
//! - Atomic file replacement
//! - Text helpers for spreadsheet headers and free-text cells

pub mod config;
pub mod error;
pub mod fs;
pub mod text;

pub use error::{Error, Result};
