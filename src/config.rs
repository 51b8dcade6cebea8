//! Construction parameters for caches.
//!
//! [`CacheParams`] carries the knobs shared by every eviction policy (byte
//! budget, per-object overhead, index sizing, default TTL); policy-specific
//! parameter structs such as [`SlruParams`] ride alongside it. Both validate
//! eagerly so that constructors fail with a [`ConfigError`] instead of
//! producing a cache that can never admit an object.

use crate::error::ConfigError;

/// Default log2 of the per-tier hash index bucket count.
pub const DEFAULT_HASHPOWER: u8 = 16;

/// Smallest accepted hashpower.
pub const MIN_HASHPOWER: u8 = 1;

/// Largest accepted hashpower. 2^28 bucket cells is already 2 GiB of chain
/// heads per tier; anything beyond that is a configuration mistake.
pub const MAX_HASHPOWER: u8 = 28;

/// Parameters shared by all cache policies.
///
/// # Example
///
/// ```
/// use cachesim::config::CacheParams;
///
/// let params = CacheParams {
///     per_obj_overhead: 24,
///     ..CacheParams::new(1 << 20)
/// };
/// assert_eq!(params.cache_size, 1 << 20);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheParams {
    /// Total byte budget of the cache.
    pub cache_size: u64,

    /// Bookkeeping bytes charged on top of every object's size.
    pub per_obj_overhead: u64,

    /// log2 of the bucket count of each tier's hash index.
    pub hashpower: u8,

    /// TTL applied to objects whose request carries none. `None` disables
    /// expiration for such objects.
    pub default_ttl: Option<u64>,
}

impl CacheParams {
    /// Creates parameters for a cache of `cache_size` bytes with no
    /// per-object overhead, the default index sizing, and no default TTL.
    pub fn new(cache_size: u64) -> Self {
        Self {
            cache_size,
            per_obj_overhead: 0,
            hashpower: DEFAULT_HASHPOWER,
            default_ttl: None,
        }
    }

    /// Validates the shared parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_size == 0 {
            return Err(ConfigError::new("cache_size must be greater than zero"));
        }
        if !(MIN_HASHPOWER..=MAX_HASHPOWER).contains(&self.hashpower) {
            return Err(ConfigError::new(format!(
                "hashpower must be in [{MIN_HASHPOWER}, {MAX_HASHPOWER}], got {}",
                self.hashpower
            )));
        }
        Ok(())
    }
}

impl Default for CacheParams {
    /// 1 MiB cache with no overhead, default index sizing, no TTL.
    fn default() -> Self {
        Self::new(1 << 20)
    }
}

/// SLRU-specific parameters.
///
/// The byte budget from [`CacheParams`] is divided across `n_seg` tiers with
/// integer division; the remainder is allocated to tier 0 so no capacity is
/// lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlruParams {
    /// Number of LRU tiers, coldest first. Must be at least 1.
    pub n_seg: usize,
}

impl SlruParams {
    /// Validates the tier count against the shared parameters.
    pub fn validate(&self, common: &CacheParams) -> Result<(), ConfigError> {
        if self.n_seg == 0 {
            return Err(ConfigError::new("n_seg must be at least 1"));
        }
        if common.cache_size < self.n_seg as u64 {
            return Err(ConfigError::new(format!(
                "cache_size ({}) must be at least n_seg ({}) bytes",
                common.cache_size, self.n_seg
            )));
        }
        Ok(())
    }
}

impl Default for SlruParams {
    /// Four tiers.
    fn default() -> Self {
        Self { n_seg: 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let common = CacheParams::default();
        assert!(common.validate().is_ok());
        assert!(SlruParams::default().validate(&common).is_ok());
    }

    #[test]
    fn zero_cache_size_rejected() {
        let err = CacheParams::new(0).validate().unwrap_err();
        assert!(err.to_string().contains("cache_size"));
    }

    #[test]
    fn hashpower_bounds_enforced() {
        let mut params = CacheParams::new(1024);
        params.hashpower = 0;
        assert!(params.validate().is_err());
        params.hashpower = MAX_HASHPOWER + 1;
        assert!(params.validate().is_err());
        params.hashpower = MAX_HASHPOWER;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn zero_tiers_rejected() {
        let common = CacheParams::new(1024);
        let err = SlruParams { n_seg: 0 }.validate(&common).unwrap_err();
        assert!(err.to_string().contains("n_seg"));
    }

    #[test]
    fn more_tiers_than_bytes_rejected() {
        let common = CacheParams::new(4);
        assert!(SlruParams { n_seg: 8 }.validate(&common).is_err());
        assert!(SlruParams { n_seg: 4 }.validate(&common).is_ok());
    }
}
