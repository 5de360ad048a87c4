//! facmap library interface
//!
//! Geocodes a facility spreadsheet and renders it as a Leaflet map. The
//! binary is a thin CLI over `config::RunSettings` and `workflow::MapRun`;
//! everything is exposed here for integration testing.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod types;
pub mod workflow;

pub use crate::error::{FacmapError, FacmapResult};
