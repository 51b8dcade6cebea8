//! # Eviction Policy Capability Set
//!
//! Every eviction policy exposes the same family of request operations; the
//! simulator driver only ever talks to this trait. The Segmented LRU composes
//! the same capability over its inner tiers, so a single-tier SLRU and a
//! plain LRU are interchangeable behind it.
//!
//! ## Operations
//!
//! | Operation        | Mutates | Purpose                                       |
//! |------------------|---------|-----------------------------------------------|
//! | `get`            | yes     | lookup + admit on miss (unless oversized)     |
//! | `check`          | opt-in  | lookup; recency/promotion only when `update`  |
//! | `insert`         | yes     | unconditional admission, evicting as needed   |
//! | `evict`          | yes     | forced single eviction from the coldest end   |
//! | `remove`         | yes     | explicit removal; warns when absent           |
//! | `to_evict`       | no      | preview of the next eviction victim           |
//! | `occupied_size`  | no      | bytes used, including per-object overhead     |
//! | `capacity`       | no      | byte budget                                   |
//! | `n_obj`          | no      | resident object count                         |
//!
//! ## Example
//!
//! ```
//! use cachesim::config::{CacheParams, SlruParams};
//! use cachesim::policy::slru::SlruCache;
//! use cachesim::request::Request;
//! use cachesim::traits::{CheckResult, EvictionPolicy};
//!
//! fn replay<P: EvictionPolicy>(policy: &mut P, trace: &[Request]) -> u64 {
//!     let mut hits = 0;
//!     for req in trace {
//!         if policy.get(req) == CheckResult::Hit {
//!             hits += 1;
//!         }
//!     }
//!     hits
//! }
//!
//! let mut cache =
//!     SlruCache::new(&CacheParams::new(100), &SlruParams { n_seg: 2 }).unwrap();
//! let trace = vec![Request::new(1, 10), Request::new(1, 10)];
//! assert_eq!(replay(&mut cache, &trace), 1);
//! ```

use crate::obj::{Obj, ObjId};
use crate::request::Request;

/// Outcome of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    /// The object is resident and valid.
    Hit,
    /// The object is not resident.
    Miss,
    /// The object is resident but its TTL has elapsed.
    Expired,
}

impl CheckResult {
    /// True only for [`CheckResult::Hit`].
    pub fn is_hit(self) -> bool {
        matches!(self, CheckResult::Hit)
    }
}

/// Request operations every eviction policy supports.
///
/// The mutating operations take `&mut self`; policies are single-threaded by
/// default and concurrency, where offered, comes from explicit wrapper types
/// (e.g. [`ConcurrentSlruCache`](crate::policy::slru::ConcurrentSlruCache)).
pub trait EvictionPolicy {
    /// Looks up `req`, updating recency and promotion state on a hit. On a
    /// miss or an expired hit, admits the object unless its size plus
    /// per-object overhead exceeds the total capacity. Returns the lookup
    /// outcome from before any admission.
    fn get(&mut self, req: &Request) -> CheckResult;

    /// Looks up `req`. With `update` set, a hit refreshes recency (and, for
    /// tiered policies, triggers promotion); without it the call is
    /// read-only.
    fn check(&mut self, req: &Request, update: bool) -> CheckResult;

    /// Admits `req` unconditionally, evicting from the coldest end until the
    /// object fits.
    fn insert(&mut self, req: &Request);

    /// Forces a single eviction from the coldest end, transferring ownership
    /// of the victim's metadata to the caller. Returns `None` when there is
    /// nothing to evict.
    fn evict(&mut self) -> Option<Obj>;

    /// Removes `obj_id` wherever it resides. Returns `false` (after logging
    /// a warning) when the object is not in the cache.
    fn remove(&mut self, obj_id: ObjId) -> bool;

    /// Previews the object [`evict`](Self::evict) would remove next, without
    /// removing it.
    fn to_evict(&self) -> Option<&Obj>;

    /// Bytes currently occupied, including per-object overhead.
    fn occupied_size(&self) -> u64;

    /// Byte budget.
    fn capacity(&self) -> u64;

    /// Number of resident objects.
    fn n_obj(&self) -> u64;

    /// True when nothing is resident.
    fn is_empty(&self) -> bool {
        self.n_obj() == 0
    }
}
