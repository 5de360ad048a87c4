//! Run workflow
//!
//! One sequential pass over the facility rows:
//! 1. Normalize the address and look it up in the cache
//! 2. Geocode cache misses with fallback
//! 3. Collect markers and unresolved rows
//! 4. Write the cache, the map page and the report

pub mod pipeline;
pub mod statistics;

pub use pipeline::{MapRun, RunOptions, RunOutcome};
pub use statistics::RunStatistics;
