//! Run statistics

use crate::types::PrecisionTier;
use std::fmt;
use tracing::info;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Rows read from the sheet
    pub rows: usize,
    pub empty_addresses: usize,
    /// Positive cache hits
    pub cache_hits: usize,
    /// Remembered misses served from the cache
    pub negative_cache_hits: usize,
    /// Rows sent to the geocoder
    pub network_lookups: usize,
    /// Rows where at least one backend request failed
    pub lookup_failures: usize,
    pub resolved_house: usize,
    pub resolved_street: usize,
    pub resolved_city: usize,
    pub misses: usize,
}

impl RunStatistics {
    pub fn record_resolved(&mut self, tier: PrecisionTier) {
        match tier {
            PrecisionTier::House => self.resolved_house += 1,
            PrecisionTier::Street => self.resolved_street += 1,
            PrecisionTier::City => self.resolved_city += 1,
        }
    }

    pub fn resolved(&self) -> usize {
        self.resolved_house + self.resolved_street + self.resolved_city
    }

    pub fn resolved_at(&self, tier: PrecisionTier) -> usize {
        match tier {
            PrecisionTier::House => self.resolved_house,
            PrecisionTier::Street => self.resolved_street,
            PrecisionTier::City => self.resolved_city,
        }
    }

    /// Log the summary at info level
    pub fn log_summary(&self) {
        info!(
            rows = self.rows,
            resolved = self.resolved(),
            house = self.resolved_house,
            street = self.resolved_street,
            city = self.resolved_city,
            misses = self.misses,
            cache_hits = self.cache_hits,
            negative_cache_hits = self.negative_cache_hits,
            network_lookups = self.network_lookups,
            lookup_failures = self.lookup_failures,
            "Run complete"
        );
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows: {} resolved (house {}, street {}, city {}), {} not resolved; \
             cache {} hits / {} remembered misses, {} lookups",
            self.rows,
            self.resolved(),
            self.resolved_house,
            self.resolved_street,
            self.resolved_city,
            self.misses,
            self.cache_hits,
            self.negative_cache_hits,
            self.network_lookups
        )
    }
}
