//! Write-once JSON cache of aggregated encounter bins.
//!
//! The file is a single JSON object keyed by encounter id:
//!
//! ```json
//! {
//!   "E04": {
//!     "perihelion": "2020-01-29T09:37:00Z",
//!     "n_detections": 1731,
//!     "bins": [
//!       {"start_lon": 82.1, "end_lon": 84.9, "ham_count": 12, "all_count": 12, "ham_frac": 0.923}
//!     ]
//!   }
//! }
//! ```
//!
//! Entries are never overwritten. A recomputation is checked against the
//! cached entry with [`compare_bins`] and any disagreement is reported, not
//! corrected.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::angular::{AngularBin, Encounter};
use crate::services::angular::wrap_delta;

/// Absolute tolerance for longitude and fraction comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Encounter {0} is already cached")]
    AlreadyCached(String),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEncounter {
    pub perihelion: DateTime<Utc>,
    pub n_detections: u64,
    pub bins: Vec<AngularBin>,
}

impl CachedEncounter {
    pub fn from_encounter(encounter: &Encounter, n_detections: u64) -> Self {
        Self {
            perihelion: encounter.perihelion,
            n_detections,
            bins: encounter.bins.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinCache {
    entries: BTreeMap<String, CachedEncounter>,
}

impl BinCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a cache file. A missing file is an empty cache.
    pub fn load<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No bin cache at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let cache: BinCache = serde_json::from_str(&content)?;
        log::debug!("Loaded {} cached encounters from {}", cache.len(), path.display());
        Ok(cache)
    }

    /// Write the cache as pretty JSON through a temporary sibling file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CacheResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = Path::new(&tmp);
        {
            let mut file = fs::File::create(tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(tmp, path)?;
        log::info!("Saved {} encounters to {}", self.len(), path.display());
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&CachedEncounter> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert a new entry. An id that is already present is rejected.
    pub fn insert(&mut self, id: impl Into<String>, entry: CachedEncounter) -> CacheResult<()> {
        let id = id.into();
        if self.entries.contains_key(&id) {
            return Err(CacheError::AlreadyCached(id));
        }
        self.entries.insert(id, entry);
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheDiscrepancy {
    BinCountDiffers {
        fresh: usize,
        cached: usize,
    },
    FieldDiffers {
        index: usize,
        field: String,
        fresh: f64,
        cached: f64,
    },
    CountDiffers {
        index: usize,
        field: String,
        fresh: u64,
        cached: u64,
    },
}

/// Every disagreement between freshly computed bins and a cached entry.
///
/// Longitudes are compared around the circle, so 359.9999 and 0.0001 agree.
/// Counts must match exactly. When the bin counts differ only the common
/// prefix is compared field by field.
pub fn compare_bins(
    fresh: &[AngularBin],
    cached: &[AngularBin],
    tolerance: f64,
) -> Vec<CacheDiscrepancy> {
    let mut out = Vec::new();
    if fresh.len() != cached.len() {
        out.push(CacheDiscrepancy::BinCountDiffers {
            fresh: fresh.len(),
            cached: cached.len(),
        });
    }

    for (index, (f, c)) in fresh.iter().zip(cached).enumerate() {
        let lons = [
            ("start_lon", f.start_lon.value(), c.start_lon.value()),
            ("end_lon", f.end_lon.value(), c.end_lon.value()),
        ];
        for (field, a, b) in lons {
            if !(wrap_delta(b, a).abs() <= tolerance) {
                out.push(field_differs(index, field, a, b));
            }
        }
        if !fractions_agree(f.ham_frac, c.ham_frac, tolerance) {
            out.push(field_differs(index, "ham_frac", f.ham_frac, c.ham_frac));
        }
        for (field, a, b) in [
            ("ham_count", f.ham_count, c.ham_count),
            ("all_count", f.all_count, c.all_count),
        ] {
            if a != b {
                out.push(CacheDiscrepancy::CountDiffers {
                    index,
                    field: field.to_string(),
                    fresh: a,
                    cached: b,
                });
            }
        }
    }
    out
}

fn field_differs(index: usize, field: &str, fresh: f64, cached: f64) -> CacheDiscrepancy {
    CacheDiscrepancy::FieldDiffers {
        index,
        field: field.to_string(),
        fresh,
        cached,
    }
}

fn fractions_agree(a: f64, b: f64, tolerance: f64) -> bool {
    (a.is_nan() && b.is_nan()) || (a - b).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> CachedEncounter {
        CachedEncounter {
            perihelion: Utc.with_ymd_and_hms(2020, 1, 29, 9, 37, 0).unwrap(),
            n_detections: 3,
            bins: vec![AngularBin::new(10.0, 12.0, 2, 10), AngularBin::new(12.0, 14.0, 1, 10)],
        }
    }

    #[test]
    fn test_insert_is_write_once() {
        let mut cache = BinCache::new();
        cache.insert("E04", entry()).unwrap();
        let err = cache.insert("E04", entry()).unwrap_err();
        assert!(matches!(err, CacheError::AlreadyCached(ref id) if id == "E04"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_json_layout() {
        let mut cache = BinCache::new();
        cache.insert("E04", entry()).unwrap();
        let value = serde_json::to_value(&cache).unwrap();
        let e04 = &value["E04"];
        assert_eq!(e04["perihelion"], "2020-01-29T09:37:00Z");
        assert_eq!(e04["n_detections"], 3);
        assert_eq!(e04["bins"][0]["start_lon"], 10.0);
        assert_eq!(e04["bins"][1]["all_count"], 10);
    }

    #[test]
    fn test_identical_bins_agree() {
        let bins = entry().bins;
        assert!(compare_bins(&bins, &bins, DEFAULT_TOLERANCE).is_empty());
    }

    #[test]
    fn test_small_drift_within_tolerance() {
        let cached = entry().bins;
        let mut fresh = cached.clone();
        fresh[0].start_lon = qtty::Degrees::new(10.0005);
        assert!(compare_bins(&fresh, &cached, DEFAULT_TOLERANCE).is_empty());
    }

    #[test]
    fn test_seam_longitudes_agree() {
        let cached = vec![AngularBin::new(359.9999, 1.0, 0, 1)];
        let fresh = vec![AngularBin::new(0.0001, 1.0, 0, 1)];
        assert!(compare_bins(&fresh, &cached, DEFAULT_TOLERANCE).is_empty());
    }

    #[test]
    fn test_field_and_count_discrepancies() {
        let cached = entry().bins;
        let mut fresh = cached.clone();
        fresh[1].end_lon = qtty::Degrees::new(15.0);
        fresh[1].ham_count = 5;
        let found = compare_bins(&fresh, &cached, DEFAULT_TOLERANCE);
        assert_eq!(found.len(), 2);
        assert!(matches!(
            &found[0],
            CacheDiscrepancy::FieldDiffers { index: 1, field, .. } if field == "end_lon"
        ));
        assert!(matches!(
            &found[1],
            CacheDiscrepancy::CountDiffers { index: 1, fresh: 5, cached: 1, .. }
        ));
    }

    #[test]
    fn test_bin_count_differs() {
        let cached = entry().bins;
        let found = compare_bins(&cached[..1], &cached, DEFAULT_TOLERANCE);
        assert_eq!(
            found,
            vec![CacheDiscrepancy::BinCountDiffers {
                fresh: 1,
                cached: 2
            }]
        );
    }
}
