//! Single-tier LRU primitive.
//!
//! A [`LruTier`] is one size-aware LRU sub-cache: a recency list over an
//! [`ObjArena`] plus a per-tier [`HashIndex`] mapping `obj_id` to the arena
//! handle. It is the building block the Segmented LRU stacks into tiers, and
//! doubles as a plain LRU policy through [`EvictionPolicy`].
//!
//! ## Layout
//!
//! ```text
//!   index: HashIndex<ObjRef>          arena: ObjArena
//!
//!   obj_id ──► ObjRef ───────────────► Obj { obj_id, obj_size,
//!                                            expire_at, lru_prev, lru_next }
//!
//!   recency list (links stored inline in Obj):
//!
//!     head (MRU) ─► [r_2] ◄──► [r_0] ◄──► [r_5] ◄─ tail (LRU, next victim)
//! ```
//!
//! Occupancy charges `obj_size + per_obj_overhead` per resident. The raw
//! mutators ([`insert_obj`](LruTier::insert_obj), [`take`](LruTier::take),
//! [`evict`](LruTier::evict)) assume the caller has already made room; the
//! [`EvictionPolicy`] implementation layers the evict-until-fits admission
//! on top.

use tracing::warn;

use crate::ds::hash_index::HashIndex;
use crate::ds::obj_arena::{ObjArena, ObjRef};
use crate::obj::{Obj, ObjId};
use crate::request::Request;
use crate::traits::{CheckResult, EvictionPolicy};

#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;

/// One size-aware LRU sub-cache.
#[derive(Debug)]
pub struct LruTier {
    capacity: u64,
    occupied_size: u64,
    per_obj_overhead: u64,
    default_ttl: Option<u64>,
    /// MRU end of the recency list.
    head: Option<ObjRef>,
    /// LRU end of the recency list; the next eviction victim.
    tail: Option<ObjRef>,
    arena: ObjArena,
    index: HashIndex<ObjRef>,
}

impl LruTier {
    /// Creates an empty tier with the given byte budget.
    pub fn new(
        capacity: u64,
        per_obj_overhead: u64,
        hashpower: u8,
        default_ttl: Option<u64>,
    ) -> Self {
        Self {
            capacity,
            occupied_size: 0,
            per_obj_overhead,
            default_ttl,
            head: None,
            tail: None,
            arena: ObjArena::new(),
            index: HashIndex::new(hashpower),
        }
    }

    /// Bytes currently occupied, including per-object overhead.
    pub fn occupied_size(&self) -> u64 {
        self.occupied_size
    }

    /// Byte budget.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Number of resident objects.
    pub fn n_obj(&self) -> u64 {
        self.arena.len() as u64
    }

    /// True when admitting `obj_size` more bytes would stay within budget.
    pub fn fits(&self, obj_size: u64) -> bool {
        self.occupied_size + obj_size + self.per_obj_overhead <= self.capacity
    }

    /// True when `obj_id` is resident, without touching recency.
    pub fn contains(&self, obj_id: ObjId) -> bool {
        self.index.find(obj_id).is_some()
    }

    /// Looks up `req` in this tier.
    ///
    /// On a valid hit with `update_recency` set, the object moves to the MRU
    /// end. An expired resident reports [`CheckResult::Expired`]; with
    /// `update_recency` set the stale node is reclaimed on the spot so a
    /// follow-up insert starts clean, otherwise it is left untouched.
    pub fn check(&mut self, req: &Request, update_recency: bool) -> CheckResult {
        let Some(slot) = self.index.find(req.obj_id) else {
            return CheckResult::Miss;
        };
        let expired = self
            .arena
            .get(slot)
            .expect("indexed slot must be live")
            .is_expired(req.time);
        if expired {
            if update_recency {
                self.unlink(req.obj_id, slot);
            }
            return CheckResult::Expired;
        }
        if update_recency {
            self.move_to_head(slot);
        }
        CheckResult::Hit
    }

    /// Places a node built from `req` at the MRU end and indexes it. Assumes
    /// the caller already made room (see [`fits`](Self::fits)).
    pub fn insert(&mut self, req: &Request) {
        self.insert_obj(Obj::from_request(req, self.default_ttl));
    }

    /// Places an already-built node at the MRU end, preserving its
    /// expiration deadline. Used for admission and for receiving objects in
    /// transfer (promotion and cooling).
    pub fn insert_obj(&mut self, mut obj: Obj) {
        obj.lru_prev = None;
        obj.lru_next = None;
        obj.in_cache = false;
        let obj_id = obj.obj_id;
        let obj_size = obj.obj_size;

        let slot = self.arena.insert(obj);
        if let Some(displaced) = self.index.insert(obj_id, slot) {
            // Same id was already resident: the new node took its chain
            // position, so the old node must leave the recency list too.
            self.detach(displaced);
            let old = self
                .arena
                .remove(displaced)
                .expect("displaced resident must be live");
            self.occupied_size -= old.obj_size + self.per_obj_overhead;
        }

        self.attach_head(slot);
        if let Some(node) = self.arena.get_mut(slot) {
            node.in_cache = true;
        }
        self.occupied_size += obj_size + self.per_obj_overhead;
    }

    /// Removes the LRU-end node, transferring ownership to the caller.
    pub fn evict(&mut self) -> Option<Obj> {
        let slot = self.tail?;
        let obj_id = self
            .arena
            .get(slot)
            .expect("tail slot must be live")
            .obj_id;
        self.index.delete(obj_id);
        Some(self.unlink_slot(slot))
    }

    /// Unlinks `obj_id` from the list and the index, transferring ownership
    /// to the caller. `None` if absent. This is the transfer half of
    /// promotion and cooling.
    pub fn take(&mut self, obj_id: ObjId) -> Option<Obj> {
        let slot = self.index.delete(obj_id)?;
        Some(self.unlink_slot(slot))
    }

    /// Removes `obj_id`, warning when it is not resident.
    pub fn remove(&mut self, obj_id: ObjId) -> bool {
        if self.take(obj_id).is_some() {
            true
        } else {
            warn!(obj_id, "object to remove is not in this tier");
            false
        }
    }

    /// The LRU-end node, without removing it.
    pub fn to_evict(&self) -> Option<&Obj> {
        self.tail.and_then(|slot| self.arena.get(slot))
    }

    /// Reclaims a resident known to be at `slot` (index entry included).
    fn unlink(&mut self, obj_id: ObjId, slot: ObjRef) {
        self.index.delete(obj_id);
        self.unlink_slot(slot);
    }

    /// Detaches `slot` from the recency list, releases its occupancy, and
    /// returns the node. The index entry must already be gone.
    fn unlink_slot(&mut self, slot: ObjRef) -> Obj {
        self.detach(slot);
        let mut obj = self
            .arena
            .remove(slot)
            .expect("unlinked slot must be live");
        self.occupied_size -= obj.obj_size + self.per_obj_overhead;
        obj.in_cache = false;
        obj.lru_prev = None;
        obj.lru_next = None;
        obj
    }

    fn attach_head(&mut self, slot: ObjRef) {
        let old_head = self.head;
        if let Some(node) = self.arena.get_mut(slot) {
            node.lru_prev = None;
            node.lru_next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(node) = self.arena.get_mut(h) {
                    node.lru_prev = Some(slot);
                }
            }
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn detach(&mut self, slot: ObjRef) {
        let (prev, next) = match self.arena.get(slot) {
            Some(node) => (node.lru_prev, node.lru_next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.arena.get_mut(p) {
                    node.lru_next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.arena.get_mut(n) {
                    node.lru_prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.arena.get_mut(slot) {
            node.lru_prev = None;
            node.lru_next = None;
        }
    }

    fn move_to_head(&mut self, slot: ObjRef) {
        if self.head == Some(slot) {
            return;
        }
        self.detach(slot);
        self.attach_head(slot);
    }

    /// Validates list structure, index agreement, and size accounting.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut count = 0u64;
        let mut charged = 0u64;
        let mut prev = None;
        let mut cur = self.head;

        while let Some(slot) = cur {
            let node = self
                .arena
                .get(slot)
                .ok_or_else(|| InvariantError::new("recency list links a dead slot"))?;
            if node.lru_prev != prev {
                return Err(InvariantError::new("recency list prev link mismatch"));
            }
            if !node.in_cache {
                return Err(InvariantError::new("listed node not marked in_cache"));
            }
            if self.index.find(node.obj_id) != Some(slot) {
                return Err(InvariantError::new("index disagrees with recency list"));
            }
            count += 1;
            charged += node.obj_size + self.per_obj_overhead;
            if count > self.arena.len() as u64 {
                return Err(InvariantError::new("cycle in recency list"));
            }
            prev = cur;
            cur = node.lru_next;
        }

        if self.tail != prev {
            return Err(InvariantError::new("dangling tail"));
        }
        if count != self.arena.len() as u64 {
            return Err(InvariantError::new("recency list length mismatch"));
        }
        if count != self.index.n_obj() {
            return Err(InvariantError::new("index entry count mismatch"));
        }
        if charged != self.occupied_size {
            return Err(InvariantError::new("occupied_size mismatch"));
        }
        Ok(())
    }
}

impl EvictionPolicy for LruTier {
    fn get(&mut self, req: &Request) -> CheckResult {
        let ret = self.check(req, true);
        if ret == CheckResult::Hit {
            return ret;
        }
        if req.obj_size + self.per_obj_overhead > self.capacity {
            return ret;
        }
        EvictionPolicy::insert(self, req);
        ret
    }

    fn check(&mut self, req: &Request, update: bool) -> CheckResult {
        LruTier::check(self, req, update)
    }

    /// Unconditional admission: evicts from the LRU end until the object
    /// fits, then places it at the MRU end.
    fn insert(&mut self, req: &Request) {
        while !self.fits(req.obj_size) {
            if self.evict().is_none() {
                warn!(
                    obj_id = req.obj_id,
                    obj_size = req.obj_size,
                    "object larger than tier budget, dropping insert"
                );
                return;
            }
        }
        LruTier::insert(self, req);
    }

    fn evict(&mut self) -> Option<Obj> {
        LruTier::evict(self)
    }

    fn remove(&mut self, obj_id: ObjId) -> bool {
        LruTier::remove(self, obj_id)
    }

    fn to_evict(&self) -> Option<&Obj> {
        LruTier::to_evict(self)
    }

    fn occupied_size(&self) -> u64 {
        self.occupied_size
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn n_obj(&self) -> u64 {
        LruTier::n_obj(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(capacity: u64) -> LruTier {
        LruTier::new(capacity, 0, 8, None)
    }

    fn req(obj_id: u64, obj_size: u64) -> Request {
        Request::new(obj_id, obj_size)
    }

    // ==============================================
    // Basic hit / miss and recency
    // ==============================================

    #[test]
    fn miss_then_hit_after_insert() {
        let mut tier = tier(10);
        assert_eq!(tier.check(&req(1, 2), true), CheckResult::Miss);

        tier.insert(&req(1, 2));
        assert_eq!(tier.check(&req(1, 2), true), CheckResult::Hit);
        assert_eq!(tier.n_obj(), 1);
        assert_eq!(tier.occupied_size(), 2);
        tier.check_invariants().unwrap();
    }

    #[test]
    fn hit_with_update_moves_to_mru() {
        let mut tier = tier(10);
        tier.insert(&req(1, 1));
        tier.insert(&req(2, 1));
        tier.insert(&req(3, 1));
        assert_eq!(tier.to_evict().map(|o| o.obj_id), Some(1));

        tier.check(&req(1, 1), true);
        assert_eq!(tier.to_evict().map(|o| o.obj_id), Some(2));
        tier.check_invariants().unwrap();
    }

    #[test]
    fn hit_without_update_keeps_order() {
        let mut tier = tier(10);
        tier.insert(&req(1, 1));
        tier.insert(&req(2, 1));

        assert_eq!(tier.check(&req(1, 1), false), CheckResult::Hit);
        assert_eq!(tier.to_evict().map(|o| o.obj_id), Some(1));
    }

    // ==============================================
    // Eviction and transfer
    // ==============================================

    #[test]
    fn evict_removes_lru_end_in_order() {
        let mut tier = tier(10);
        for id in 1..=3 {
            tier.insert(&req(id, 2));
        }
        assert_eq!(tier.evict().map(|o| o.obj_id), Some(1));
        assert_eq!(tier.evict().map(|o| o.obj_id), Some(2));
        assert_eq!(tier.occupied_size(), 2);
        assert!(!tier.contains(1));
        tier.check_invariants().unwrap();
    }

    #[test]
    fn evict_empty_tier_is_none() {
        let mut tier = tier(10);
        assert!(tier.evict().is_none());
    }

    #[test]
    fn evicted_obj_transfers_ownership_detached() {
        let mut tier = tier(10);
        tier.insert(&req(1, 4));
        let obj = tier.evict().unwrap();
        assert!(!obj.in_cache());
        assert_eq!(obj.obj_size, 4);
        assert_eq!(tier.n_obj(), 0);
        assert_eq!(tier.occupied_size(), 0);
    }

    #[test]
    fn take_unlinks_by_id() {
        let mut tier = tier(10);
        tier.insert(&req(1, 1));
        tier.insert(&req(2, 1));

        let obj = tier.take(2).unwrap();
        assert_eq!(obj.obj_id, 2);
        assert!(!tier.contains(2));
        assert!(tier.contains(1));
        assert_eq!(tier.take(2), None);
        tier.check_invariants().unwrap();
    }

    #[test]
    fn remove_absent_is_nonfatal_false() {
        let mut tier = tier(10);
        tier.insert(&req(1, 1));
        assert!(tier.remove(1));
        assert!(!tier.remove(1));
        assert_eq!(tier.n_obj(), 0);
    }

    // ==============================================
    // Size accounting
    // ==============================================

    #[test]
    fn overhead_is_charged_per_object() {
        let mut tier = LruTier::new(100, 10, 8, None);
        tier.insert(&req(1, 5));
        tier.insert(&req(2, 5));
        assert_eq!(tier.occupied_size(), 30);
        assert!(tier.fits(60));
        assert!(!tier.fits(61));
        tier.check_invariants().unwrap();
    }

    #[test]
    fn reinsert_same_id_replaces_resident() {
        let mut tier = tier(100);
        tier.insert(&req(1, 10));
        tier.insert(&req(1, 20));
        assert_eq!(tier.n_obj(), 1);
        assert_eq!(tier.occupied_size(), 20);
        tier.check_invariants().unwrap();
    }

    // ==============================================
    // Expiration
    // ==============================================

    #[test]
    fn expired_resident_reports_expired() {
        let mut tier = LruTier::new(10, 0, 8, Some(5));
        tier.insert(&req(1, 1));

        assert_eq!(tier.check(&req(1, 1).at(4), false), CheckResult::Hit);
        assert_eq!(tier.check(&req(1, 1).at(5), false), CheckResult::Expired);
        // Read-only check left the stale node in place.
        assert_eq!(tier.n_obj(), 1);
    }

    #[test]
    fn updating_check_reclaims_expired_resident() {
        let mut tier = LruTier::new(10, 0, 8, Some(5));
        tier.insert(&req(1, 1));

        assert_eq!(tier.check(&req(1, 1).at(9), true), CheckResult::Expired);
        assert_eq!(tier.n_obj(), 0);
        assert_eq!(tier.occupied_size(), 0);
        assert_eq!(tier.check(&req(1, 1).at(9), true), CheckResult::Miss);
        tier.check_invariants().unwrap();
    }

    #[test]
    fn request_ttl_overrides_default() {
        let mut tier = LruTier::new(10, 0, 8, Some(100));
        tier.insert(&req(1, 1).with_ttl(2));
        assert_eq!(tier.check(&req(1, 1).at(2), false), CheckResult::Expired);
    }

    // ==============================================
    // EvictionPolicy admission
    // ==============================================

    #[test]
    fn policy_get_admits_on_miss() {
        let mut tier = tier(3);
        assert_eq!(EvictionPolicy::get(&mut tier, &req(1, 1)), CheckResult::Miss);
        assert_eq!(EvictionPolicy::get(&mut tier, &req(1, 1)), CheckResult::Hit);
    }

    #[test]
    fn policy_get_refuses_oversized_object() {
        let mut tier = tier(3);
        assert_eq!(EvictionPolicy::get(&mut tier, &req(1, 4)), CheckResult::Miss);
        assert_eq!(tier.n_obj(), 0);
    }

    #[test]
    fn policy_insert_evicts_until_fit() {
        let mut tier = tier(3);
        for id in 1..=3 {
            EvictionPolicy::insert(&mut tier, &req(id, 1));
        }
        EvictionPolicy::insert(&mut tier, &req(4, 2));
        assert!(!tier.contains(1));
        assert!(!tier.contains(2));
        assert!(tier.contains(3));
        assert!(tier.contains(4));
        tier.check_invariants().unwrap();
    }
}
