//! Segmented LRU (SLRU) eviction policy.
//!
//! Stacks `n_seg` size-aware LRU tiers, coldest first. A hit promotes the
//! object one tier up; the space it needs there is made by cooling the upper
//! tier's coldest objects back down, cascading until tier 0 evicts for real.
//! Fresh objects are admitted to the lowest tier with room, so upward motion
//! has to be earned by hits, which is what makes SLRU scan resistant.
//!
//! ## Architecture
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────────────────┐
//!   │                     SlruCache (n_seg = 3)                          │
//!   │                                                                    │
//!   │    tier 2 (hottest)   MRU ─► [..] ◄──► [..] ◄─ LRU                 │
//!   │        ▲ promote on hit              │ cool on overflow            │
//!   │    tier 1             MRU ─► [..] ◄──► [..] ◄─ LRU                 │
//!   │        ▲ promote on hit              │ cool on overflow            │
//!   │    tier 0 (coldest)   MRU ─► [..] ◄──► [..] ◄─ LRU ──► evicted     │
//!   │        ▲ admit on miss                                             │
//!   └────────────────────────────────────────────────────────────────────┘
//!
//!   check(req, update=true):
//!     scan tiers 0..n: Expired ─► return Expired
//!                      Hit at top ─► refresh recency, return Hit
//!                      Hit below  ─► take object, cool upper tier until it
//!                                    fits, insert above, return Hit
//!                      Miss ─► next tier
//!
//!   cool(i):
//!     evict tier i's LRU end; i == 0 discards it (true eviction),
//!     otherwise cool(i-1) until tier i-1 fits it, then insert there
//!
//!   insert(req):
//!     lowest tier with room, else evict from tier 0 until tier 0 fits
//! ```
//!
//! Each tier owns its residents and indexes them in its own
//! [`HashIndex`](crate::ds::hash_index::HashIndex); objects move between
//! tiers by value.
//!
//! ## Thread Safety
//!
//! - [`SlruCache`]: not thread-safe; promotion and cooling mutate several
//!   tiers in one step, which only stays consistent single-threaded.
//! - [`ConcurrentSlruCache`]: serializes every operation behind one mutex.
//!   Correct from any number of threads, but throughput is bounded by that
//!   single lock; the striping inside each tier's hash index cannot help
//!   while the policy lock is held.
//!
//! ## Example
//!
//! ```
//! use cachesim::config::{CacheParams, SlruParams};
//! use cachesim::policy::slru::SlruCache;
//! use cachesim::request::Request;
//! use cachesim::traits::CheckResult;
//!
//! let mut cache =
//!     SlruCache::new(&CacheParams::new(4), &SlruParams { n_seg: 2 }).unwrap();
//!
//! // Cold miss admits into the coldest tier with room.
//! assert_eq!(cache.get(&Request::new(1, 1)), CheckResult::Miss);
//!
//! // The second reference hits and earns a promotion.
//! assert_eq!(cache.get(&Request::new(1, 1)), CheckResult::Hit);
//! assert!(cache.tier(1).unwrap().contains(1));
//! ```

use parking_lot::Mutex;
use tracing::warn;

use crate::config::{CacheParams, SlruParams};
use crate::error::ConfigError;
use crate::obj::{Obj, ObjId};
use crate::policy::lru::LruTier;
use crate::request::Request;
use crate::traits::{CheckResult, EvictionPolicy};

/// Segmented LRU over `n_seg` ordered tiers, tier 0 coldest.
#[derive(Debug)]
pub struct SlruCache {
    tiers: Vec<LruTier>,
    per_obj_overhead: u64,
    total_capacity: u64,
}

impl SlruCache {
    /// Builds an SLRU from the shared and policy parameters.
    ///
    /// The byte budget is split evenly across tiers with integer division;
    /// the remainder goes to tier 0 so `capacity()` equals `cache_size`.
    pub fn new(common: &CacheParams, params: &SlruParams) -> Result<Self, ConfigError> {
        common.validate()?;
        params.validate(common)?;

        let n_seg = params.n_seg as u64;
        let per_tier = common.cache_size / n_seg;
        let remainder = common.cache_size % n_seg;

        let tiers = (0..params.n_seg)
            .map(|i| {
                let capacity = if i == 0 { per_tier + remainder } else { per_tier };
                LruTier::new(
                    capacity,
                    common.per_obj_overhead,
                    common.hashpower,
                    common.default_ttl,
                )
            })
            .collect();

        Ok(Self {
            tiers,
            per_obj_overhead: common.per_obj_overhead,
            total_capacity: common.cache_size,
        })
    }

    /// Number of tiers.
    pub fn n_seg(&self) -> usize {
        self.tiers.len()
    }

    /// Read access to tier `i` (0 = coldest), for drivers that want to
    /// inspect per-tier residency.
    pub fn tier(&self, i: usize) -> Option<&LruTier> {
        self.tiers.get(i)
    }

    /// Looks up `req`, scanning tiers coldest to hottest.
    ///
    /// With `update` set, a hit below the top tier promotes the object one
    /// tier up, cooling the receiving tier until the object fits. Expiration
    /// anywhere short-circuits the scan. Without `update` the call is
    /// read-only.
    pub fn check(&mut self, req: &Request, update: bool) -> CheckResult {
        let top = self.tiers.len() - 1;
        for i in 0..self.tiers.len() {
            match self.tiers[i].check(req, update) {
                CheckResult::Expired => return CheckResult::Expired,
                CheckResult::Hit => {
                    if update && i < top {
                        self.promote(req.obj_id, i);
                    }
                    return CheckResult::Hit;
                }
                CheckResult::Miss => {}
            }
        }
        CheckResult::Miss
    }

    /// Looks up `req` with state updates; on a miss or expired hit, admits
    /// the object unless it cannot fit the whole cache, and returns the
    /// original non-hit result.
    pub fn get(&mut self, req: &Request) -> CheckResult {
        let ret = self.check(req, true);
        if ret == CheckResult::Hit {
            return ret;
        }
        if req.obj_size + self.per_obj_overhead > self.total_capacity {
            return ret;
        }
        self.insert(req);
        ret
    }

    /// Admits `req` into the lowest tier with room. When every tier is
    /// full, evicts from tier 0 until the object fits there. Re-inserting a
    /// resident id is a replacement: the old node leaves its tier first so
    /// the id stays unique across the cache.
    pub fn insert(&mut self, req: &Request) {
        for tier in &mut self.tiers {
            if tier.contains(req.obj_id) {
                tier.take(req.obj_id);
                break;
            }
        }

        for tier in &mut self.tiers {
            if tier.fits(req.obj_size) {
                tier.insert(req);
                return;
            }
        }

        while !self.tiers[0].fits(req.obj_size) {
            if self.tiers[0].evict().is_none() {
                warn!(
                    obj_id = req.obj_id,
                    obj_size = req.obj_size,
                    "object larger than tier 0 budget, dropping insert"
                );
                return;
            }
        }
        self.tiers[0].insert(req);
    }

    /// Forces a single eviction from tier 0's LRU end, transferring the
    /// victim to the caller.
    pub fn evict(&mut self) -> Option<Obj> {
        self.tiers[0].evict()
    }

    /// The object [`evict`](Self::evict) would remove next.
    pub fn to_evict(&self) -> Option<&Obj> {
        self.tiers[0].to_evict()
    }

    /// Removes `obj_id` from whichever tier holds it. Warns and returns
    /// `false` when it is resident nowhere.
    pub fn remove(&mut self, obj_id: ObjId) -> bool {
        for tier in &mut self.tiers {
            if tier.contains(obj_id) {
                return tier.take(obj_id).is_some();
            }
        }
        warn!(obj_id, "object to remove is not in the cache");
        false
    }

    /// Bytes occupied across all tiers.
    pub fn occupied_size(&self) -> u64 {
        self.tiers.iter().map(LruTier::occupied_size).sum()
    }

    /// Total byte budget.
    pub fn capacity(&self) -> u64 {
        self.total_capacity
    }

    /// Resident objects across all tiers.
    pub fn n_obj(&self) -> u64 {
        self.tiers.iter().map(LruTier::n_obj).sum()
    }

    /// Moves the object that just hit in tier `i` up to tier `i + 1`,
    /// cooling the receiving tier until the object fits.
    fn promote(&mut self, obj_id: ObjId, i: usize) {
        let Some(obj) = self.tiers[i].take(obj_id) else {
            return;
        };
        let upper = i + 1;
        while !self.tiers[upper].fits(obj.obj_size) {
            if self.tiers[upper].n_obj() == 0 {
                // The object cannot fit even an empty tier; promoting it is
                // impossible and keeping it nowhere beats looping forever.
                warn!(
                    obj_id,
                    obj_size = obj.obj_size,
                    tier = upper,
                    "promoted object larger than tier budget, discarding"
                );
                return;
            }
            self.cool(upper);
        }
        self.tiers[upper].insert_obj(obj);
    }

    /// Demotes tier `i`'s LRU-end object into tier `i - 1`, cascading the
    /// displacement downward. At tier 0 the object is discarded: that is the
    /// cache's true eviction point.
    fn cool(&mut self, i: usize) {
        let Some(obj) = self.tiers[i].evict() else {
            return;
        };
        if i == 0 {
            return;
        }

        let lower = i - 1;
        while !self.tiers[lower].fits(obj.obj_size) {
            if self.tiers[lower].n_obj() == 0 {
                warn!(
                    obj_id = obj.obj_id,
                    obj_size = obj.obj_size,
                    tier = lower,
                    "demoted object larger than tier budget, discarding"
                );
                return;
            }
            self.cool(lower);
        }
        self.tiers[lower].insert_obj(obj);
    }
}

impl EvictionPolicy for SlruCache {
    fn get(&mut self, req: &Request) -> CheckResult {
        SlruCache::get(self, req)
    }

    fn check(&mut self, req: &Request, update: bool) -> CheckResult {
        SlruCache::check(self, req, update)
    }

    fn insert(&mut self, req: &Request) {
        SlruCache::insert(self, req)
    }

    fn evict(&mut self) -> Option<Obj> {
        SlruCache::evict(self)
    }

    fn remove(&mut self, obj_id: ObjId) -> bool {
        SlruCache::remove(self, obj_id)
    }

    fn to_evict(&self) -> Option<&Obj> {
        SlruCache::to_evict(self)
    }

    fn occupied_size(&self) -> u64 {
        SlruCache::occupied_size(self)
    }

    fn capacity(&self) -> u64 {
        SlruCache::capacity(self)
    }

    fn n_obj(&self) -> u64 {
        SlruCache::n_obj(self)
    }
}

/// Thread-safe SLRU behind a single mutex.
///
/// Every operation takes the policy lock exclusively, so this trades
/// throughput for safety; it exists for drivers that replay a trace from
/// several threads and can live with serialized policy updates.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use cachesim::config::{CacheParams, SlruParams};
/// use cachesim::policy::slru::ConcurrentSlruCache;
/// use cachesim::request::Request;
///
/// let cache = Arc::new(
///     ConcurrentSlruCache::new(&CacheParams::new(1024), &SlruParams { n_seg: 2 }).unwrap(),
/// );
///
/// let worker = Arc::clone(&cache);
/// std::thread::spawn(move || {
///     worker.get(&Request::new(1, 16));
/// })
/// .join()
/// .unwrap();
/// ```
#[derive(Debug)]
pub struct ConcurrentSlruCache {
    inner: Mutex<SlruCache>,
}

impl ConcurrentSlruCache {
    /// Builds a mutex-wrapped SLRU from the same parameters as
    /// [`SlruCache::new`].
    pub fn new(common: &CacheParams, params: &SlruParams) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: Mutex::new(SlruCache::new(common, params)?),
        })
    }

    /// See [`SlruCache::get`].
    pub fn get(&self, req: &Request) -> CheckResult {
        self.inner.lock().get(req)
    }

    /// See [`SlruCache::check`].
    pub fn check(&self, req: &Request, update: bool) -> CheckResult {
        self.inner.lock().check(req, update)
    }

    /// See [`SlruCache::insert`].
    pub fn insert(&self, req: &Request) {
        self.inner.lock().insert(req)
    }

    /// See [`SlruCache::evict`].
    pub fn evict(&self) -> Option<Obj> {
        self.inner.lock().evict()
    }

    /// See [`SlruCache::remove`].
    pub fn remove(&self, obj_id: ObjId) -> bool {
        self.inner.lock().remove(obj_id)
    }

    /// Clone of the next eviction victim's metadata. A borrow cannot escape
    /// the lock, so the preview is returned by value.
    pub fn to_evict(&self) -> Option<Obj> {
        self.inner.lock().to_evict().cloned()
    }

    /// See [`SlruCache::occupied_size`].
    pub fn occupied_size(&self) -> u64 {
        self.inner.lock().occupied_size()
    }

    /// See [`SlruCache::capacity`].
    pub fn capacity(&self) -> u64 {
        self.inner.lock().capacity()
    }

    /// See [`SlruCache::n_obj`].
    pub fn n_obj(&self) -> u64 {
        self.inner.lock().n_obj()
    }
}
