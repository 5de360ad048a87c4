//! On-disk geocode cache
//!
//! A flat JSON object mapping canonical queries to a `GeoPoint` or `null`
//! (a lookup that found nothing). The whole file is rewritten on every flush
//! through a temp file + rename, so an interrupted run never leaves a
//! truncated cache behind.
//!
//! Single process, single pass: there is no locking and no eviction.

use crate::types::GeoPoint;
use crate::types::PrecisionTier;
use facmap_common::config::{CachePersistence, CacheTiers};
use facmap_common::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Cached value: a point, or `None` for a remembered miss
pub type CachedResult = Option<GeoPoint>;

/// What `GeocodeCache::record` did with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    /// Stored as a positive hit
    Stored,
    /// Stored as a negative marker
    StoredMiss,
    /// Coarser than the tier policy allows; not cached
    Skipped,
}

/// Geocode cache backed by a JSON file
#[derive(Debug)]
pub struct GeocodeCache {
    path: PathBuf,
    entries: BTreeMap<String, CachedResult>,
    persistence: CachePersistence,
    tiers: CacheTiers,
    dirty: bool,
}

impl GeocodeCache {
    /// Empty cache that will be written to `path`
    pub fn new(path: impl Into<PathBuf>, persistence: CachePersistence, tiers: CacheTiers) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            persistence,
            tiers,
            dirty: false,
        }
    }

    /// Load the cache file
    ///
    /// A missing, unreadable or malformed file yields an empty cache; the
    /// latter two are logged as warnings.
    pub fn load(path: impl Into<PathBuf>, persistence: CachePersistence, tiers: CacheTiers) -> Self {
        let mut cache = Self::new(path, persistence, tiers);

        let content = match std::fs::read_to_string(&cache.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No geocode cache at {}, starting empty", cache.path.display());
                return cache;
            }
            Err(e) => {
                warn!("Cannot read geocode cache {}: {}; starting empty", cache.path.display(), e);
                return cache;
            }
        };

        match serde_json::from_str::<BTreeMap<String, CachedResult>>(&content) {
            Ok(entries) => {
                info!(
                    entries = entries.len(),
                    "Loaded geocode cache from {}",
                    cache.path.display()
                );
                cache.entries = entries;
            }
            Err(e) => {
                warn!("Broken geocode cache {}: {}; starting empty", cache.path.display(), e);
            }
        }

        cache
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of remembered misses
    pub fn negative_count(&self) -> usize {
        self.entries.values().filter(|v| v.is_none()).count()
    }

    /// `None` when the key was never cached; `Some(None)` for a remembered miss
    pub fn get(&self, key: &str) -> Option<&CachedResult> {
        self.entries.get(key)
    }

    /// Store `value` under `key` (flushes immediately in write-through mode)
    pub fn set(&mut self, key: impl Into<String>, value: CachedResult) -> Result<()> {
        self.entries.insert(key.into(), value);
        self.dirty = true;
        if self.persistence == CachePersistence::WriteThrough {
            self.flush()?;
        }
        Ok(())
    }

    /// Whether a result of this tier may be stored as a positive hit
    pub fn accepts_tier(&self, tier: PrecisionTier) -> bool {
        match self.tiers {
            CacheTiers::All => true,
            CacheTiers::HouseOnly => tier == PrecisionTier::House,
        }
    }

    /// Store a fresh lookup result according to the tier policy
    ///
    /// A result too coarse to cache also clears any miss marker for the key,
    /// so the next run looks it up again instead of replaying the miss.
    pub fn record(&mut self, key: &str, result: &CachedResult) -> Result<CacheWrite> {
        match result {
            None => {
                self.set(key, None)?;
                Ok(CacheWrite::StoredMiss)
            }
            Some(point) if self.accepts_tier(point.tier) => {
                self.set(key, Some(point.clone()))?;
                Ok(CacheWrite::Stored)
            }
            Some(point) => {
                debug!(key = %key, tier = %point.tier, "Result below cache tier policy, not cached");
                if self.entries.remove(key).is_some() {
                    self.dirty = true;
                    if self.persistence == CachePersistence::WriteThrough {
                        self.flush()?;
                    }
                }
                Ok(CacheWrite::Skipped)
            }
        }
    }

    /// Write the whole cache to disk if anything changed
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        facmap_common::fs::write_atomic(&self.path, json.as_bytes())?;
        self.dirty = false;
        debug!(entries = self.entries.len(), "Geocode cache written to {}", self.path.display());
        Ok(())
    }
}
