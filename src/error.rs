//! Error types for the cachesim library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache construction parameters are invalid
//!   (e.g. zero cache size, zero tier count, out-of-range hashpower).
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (debug-only `check_invariants` methods).
//!
//! ## Example Usage
//!
//! ```
//! use cachesim::config::{CacheParams, SlruParams};
//! use cachesim::policy::slru::SlruCache;
//!
//! // Fallible constructor for user-configurable parameters
//! let params = CacheParams::new(1024);
//! let cache = SlruCache::new(&params, &SlruParams { n_seg: 4 });
//! assert!(cache.is_ok());
//!
//! // Invalid configuration is caught without panicking
//! let bad = SlruCache::new(&CacheParams::new(0), &SlruParams { n_seg: 4 });
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache construction parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`SlruCache::new`](crate::policy::slru::SlruCache::new) and by
/// [`CacheParams::validate`](crate::config::CacheParams::validate). Carries a
/// human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use cachesim::config::{CacheParams, SlruParams};
/// use cachesim::policy::slru::SlruCache;
///
/// let err = SlruCache::new(&CacheParams::new(2), &SlruParams { n_seg: 8 }).unwrap_err();
/// assert!(err.to_string().contains("cache_size"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Produced by debug-only `check_invariants` methods on cache types
/// (e.g. [`LruTier::check_invariants`](crate::policy::lru::LruTier::check_invariants)).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
