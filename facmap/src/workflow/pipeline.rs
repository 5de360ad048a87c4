//! Map run orchestrator
//!
//! Drives every facility row through normalizer → cache → geocoder and
//! collects markers and misses, then writes the outputs.
//!
//! # Order of effects
//! 1. Rows are processed strictly one after another
//! 2. Zero markers is fatal: nothing is written and a batched cache is not
//!    flushed (a write-through cache already holds every lookup)
//! 3. Cache flush, then the map page, then the unresolved-address report
//!
//! # Example
//! ```rust,ignore
//! let mut run = MapRun::new(normalizer, geocoder, cache, MapSettings::default(), options);
//! let outcome = run.execute(&records).await?;
//! println!("{}", outcome.statistics);
//! ```

use super::statistics::RunStatistics;
use crate::error::{FacmapError, FacmapResult};
use crate::models::FacilityRecord;
use crate::services::address_normalizer::AddressNormalizer;
use crate::services::geocode_cache::{CacheWrite, GeocodeCache};
use crate::services::geocoder::{GeocodeOutcome, Geocoder};
use crate::services::map_builder::{MapBuilder, MapSettings};
use crate::services::report_emitter::{MissReport, DEFAULT_REPORT_COLUMN};
use crate::types::GeoPoint;
use std::path::PathBuf;
use tracing::{debug, info};

/// Output locations and run flags
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub output: PathBuf,
    pub report: PathBuf,
    pub report_column: String,
    /// Re-query addresses remembered as misses
    pub flush: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from("index.html"),
            report: PathBuf::from("missed_addresses.xlsx"),
            report_column: DEFAULT_REPORT_COLUMN.to_string(),
            flush: false,
        }
    }
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub statistics: RunStatistics,
    pub markers: usize,
    /// Unresolved addresses in row order
    pub misses: Vec<String>,
    /// Set when a report was written
    pub report: Option<PathBuf>,
}

/// One end-to-end map generation
pub struct MapRun {
    normalizer: AddressNormalizer,
    geocoder: Geocoder,
    cache: GeocodeCache,
    map_settings: MapSettings,
    options: RunOptions,
}

impl MapRun {
    pub fn new(
        normalizer: AddressNormalizer,
        geocoder: Geocoder,
        cache: GeocodeCache,
        map_settings: MapSettings,
        options: RunOptions,
    ) -> Self {
        Self {
            normalizer,
            geocoder,
            cache,
            map_settings,
            options,
        }
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Process all records and write the outputs
    ///
    /// # Errors
    /// - `NothingResolved` when no row could be placed on the map
    /// - cache, map or report write failures
    pub async fn execute(&mut self, records: &[FacilityRecord]) -> FacmapResult<RunOutcome> {
        info!(
            rows = records.len(),
            backends = ?self.geocoder.backend_names(),
            cached = self.cache.len(),
            "Starting map run"
        );

        let mut map = MapBuilder::new(self.map_settings.clone())?;
        let mut report = MissReport::new(self.options.report_column.clone());
        let mut stats = RunStatistics {
            rows: records.len(),
            ..Default::default()
        };

        for record in records {
            map.note_group(record);

            if record.address().is_empty() {
                stats.empty_addresses += 1;
                stats.misses += 1;
                report.record(record);
                continue;
            }

            match self.locate(record, &mut stats).await? {
                Some(point) => {
                    stats.record_resolved(point.tier);
                    map.add(&point, record)?;
                }
                None => {
                    stats.misses += 1;
                    report.record(record);
                }
            }

            debug!(
                row = record.row,
                found = map.len(),
                misses = report.len(),
                "Row processed"
            );
        }

        if map.is_empty() {
            stats.log_summary();
            return Err(FacmapError::NothingResolved {
                misses: report.len(),
            });
        }

        self.cache.flush()?;
        map.write_html(&self.options.output)?;
        let report_path = report
            .write(&self.options.report)?
            .then(|| self.options.report.clone());

        stats.log_summary();

        Ok(RunOutcome {
            statistics: stats,
            markers: map.len(),
            misses: report.entries().to_vec(),
            report: report_path,
        })
    }

    /// Cache lookup, then the geocoder on a miss
    async fn locate(
        &mut self,
        record: &FacilityRecord,
        stats: &mut RunStatistics,
    ) -> FacmapResult<Option<GeoPoint>> {
        let query = self.normalizer.prepare(record.address(), record.locality());

        match self.cache.get(&query.canonical) {
            Some(Some(point)) => {
                stats.cache_hits += 1;
                debug!(row = record.row, query = %query.canonical, "Cache hit");
                return Ok(Some(point.clone()));
            }
            Some(None) if !self.options.flush => {
                stats.negative_cache_hits += 1;
                debug!(row = record.row, query = %query.canonical, "Remembered miss");
                return Ok(None);
            }
            Some(None) => {
                debug!(row = record.row, query = %query.canonical, "Retrying remembered miss");
            }
            None => {}
        }

        stats.network_lookups += 1;
        match self.geocoder.resolve(&query).await {
            GeocodeOutcome::Resolved(point) => {
                let write = self.cache.record(&query.canonical, &Some(point.clone()))?;
                info!(
                    row = record.row,
                    query = %query.canonical,
                    tier = %point.tier,
                    cached = (write == CacheWrite::Stored),
                    "Resolved"
                );
                Ok(Some(point))
            }
            GeocodeOutcome::NotFound => {
                self.cache.record(&query.canonical, &None)?;
                Ok(None)
            }
            GeocodeOutcome::Failed { errors } => {
                // Not remembered: the next run tries again
                stats.lookup_failures += 1;
                debug!(row = record.row, errors, "Lookup failed, miss not cached");
                Ok(None)
            }
        }
    }
}
