//! Concurrent chained hash index with lock striping.
//!
//! Maps `obj_id` to a small copyable handle (in practice an
//! [`ObjRef`](crate::ds::obj_arena::ObjRef) into a tier's arena). Each bucket
//! is a singly linked chain of index entries; buckets fan in to a fixed
//! [`LockPool`] of reader/writer locks, so lookups on disjoint locks never
//! contend.
//!
//! ## Architecture
//!
//! ```text
//!   Lock pool (count = 2^max(0, hashpower-10))      Buckets (count = 2^hashpower)
//!   ┌─────────────┐
//!   │  rw_lock 0  │ ─ owns ─► bucket 0 ──► entry ──► entry ──► ∅
//!   │             │          bucket 2 ──► entry ──► ∅
//!   ├─────────────┤
//!   │  rw_lock 1  │ ─ owns ─► bucket 1 ──► ∅
//!   │             │          bucket 3 ──► entry ──► entry ──► entry ──► ∅
//!   └─────────────┘
//!
//!   bucket  = hash(obj_id) & (n_buckets - 1)
//!   lock    = bucket & (lock_count - 1)
//!   cell    = bucket >> locks_power          (position inside the lock's block)
//! ```
//!
//! Every bucket maps to lock `bucket & (lock_count - 1)`, the same fan-in a
//! separate lock pool would give; storing each lock's buckets inside that
//! lock keeps all chain surgery in safe code. Readers take the bucket's lock
//! shared, writers exclusive, and no operation ever holds two pool locks, so
//! there is no ordering concern.
//!
//! Chain surgery uses a cursor of type `&mut Option<Box<Entry>>` that starts
//! at the bucket head cell and advances through `next` cells. Because the
//! cursor designates the *cell pointing at* the current entry rather than
//! the entry itself, unlinking the head and unlinking mid-chain are the same
//! single branch.
//!
//! The bucket count is fixed at construction; the index does not rehash
//! online.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use rustc_hash::FxHasher;

use crate::config::{MAX_HASHPOWER, MIN_HASHPOWER};
use crate::ds::lock_pool::LockPool;
use crate::obj::ObjId;

/// Buckets per lock is 2^LOCK_SHARE_POWER; below that many buckets the pool
/// degenerates to a single lock.
const LOCK_SHARE_POWER: u8 = 10;

/// Random sampling gives up after `n_buckets * RANDOM_PROBE_FACTOR` probes
/// (at least `RANDOM_PROBE_FLOOR`).
const RANDOM_PROBE_FACTOR: usize = 4;
const RANDOM_PROBE_FLOOR: usize = 64;

/// One chain link: the indexed id, the handle it maps to, and the next link.
#[derive(Debug)]
struct Entry<V> {
    obj_id: ObjId,
    value: V,
    next: Option<Box<Entry<V>>>,
}

/// A bucket head cell. `None` for an empty bucket.
type Bucket<V> = Option<Box<Entry<V>>>;

/// Advances a cursor to the cell that points at `obj_id`'s entry, or to the
/// trailing `None` when the chain has no such entry.
fn cursor_to<V>(cell: &mut Bucket<V>, obj_id: ObjId) -> &mut Bucket<V> {
    let mut cur = cell;
    while cur.as_ref().is_some_and(|entry| entry.obj_id != obj_id) {
        cur = &mut cur.as_mut().unwrap().next;
    }
    cur
}

/// Concurrent chained hash index from `ObjId` to a copyable handle.
///
/// Thread-safe through its lock pool alone: one lock acquisition per
/// operation, shared for reads, exclusive for writes. The index never owns
/// the objects it maps; it owns only its chain entries.
///
/// # Example
///
/// ```
/// use cachesim::ds::hash_index::HashIndex;
///
/// let index: HashIndex<u32> = HashIndex::new(12);
/// assert_eq!(index.lock_count(), 4);
///
/// assert_eq!(index.insert(7, 100), None);
/// assert_eq!(index.find(7), Some(100));
///
/// // Re-inserting the same id keeps the chain position and returns the
/// // displaced handle.
/// assert_eq!(index.insert(7, 200), Some(100));
/// assert_eq!(index.n_obj(), 1);
///
/// assert_eq!(index.delete(7), Some(200));
/// assert_eq!(index.find(7), None);
/// assert!(index.is_empty());
/// ```
#[derive(Debug)]
pub struct HashIndex<V> {
    hashpower: u8,
    locks_power: u8,
    bucket_mask: u64,
    pool: LockPool<Box<[Bucket<V>]>>,
    n_obj: AtomicU64,
}

impl<V: Copy> HashIndex<V> {
    /// Creates an index with `2^hashpower` buckets and `2^max(0,
    /// hashpower-10)` locks. `hashpower` is clamped to the supported range.
    pub fn new(hashpower: u8) -> Self {
        let hashpower = hashpower.clamp(MIN_HASHPOWER, MAX_HASHPOWER);
        let locks_power = hashpower.saturating_sub(LOCK_SHARE_POWER);
        let cells_per_lock = 1usize << (hashpower - locks_power);
        let pool = LockPool::new(locks_power as u32, || {
            (0..cells_per_lock).map(|_| None).collect::<Vec<_>>().into_boxed_slice()
        });
        Self {
            hashpower,
            locks_power,
            bucket_mask: (1u64 << hashpower) - 1,
            pool,
            n_obj: AtomicU64::new(0),
        }
    }

    /// log2 of the bucket count.
    pub fn hashpower(&self) -> u8 {
        self.hashpower
    }

    /// Number of buckets.
    pub fn n_buckets(&self) -> usize {
        1usize << self.hashpower
    }

    /// Number of locks in the pool.
    pub fn lock_count(&self) -> usize {
        self.pool.lock_count()
    }

    /// Number of live entries.
    pub fn n_obj(&self) -> u64 {
        self.n_obj.load(Ordering::Acquire)
    }

    /// True when no entry is live.
    pub fn is_empty(&self) -> bool {
        self.n_obj() == 0
    }

    /// Index of the lock that serializes operations on `obj_id`. Diagnostic;
    /// ids with distinct lock indexes never contend.
    pub fn lock_of(&self, obj_id: ObjId) -> usize {
        self.pool.lock_index(self.bucket_of(obj_id))
    }

    fn bucket_of(&self, obj_id: ObjId) -> u64 {
        let mut hasher = FxHasher::default();
        obj_id.hash(&mut hasher);
        hasher.finish() & self.bucket_mask
    }

    fn cell_index(&self, bucket: u64) -> usize {
        (bucket >> self.locks_power) as usize
    }

    /// Looks up `obj_id` under the bucket's read lock. The handle comes back
    /// by copy; nothing borrowed escapes the critical section.
    pub fn find(&self, obj_id: ObjId) -> Option<V> {
        let bucket = self.bucket_of(obj_id);
        let block = self.pool.lock_for(bucket).read();
        let mut cur = block[self.cell_index(bucket)].as_deref();
        while let Some(entry) = cur {
            if entry.obj_id == obj_id {
                return Some(entry.value);
            }
            cur = entry.next.as_deref();
        }
        None
    }

    /// Maps `obj_id` to `value` under the bucket's write lock.
    ///
    /// When the id is already present, the new mapping takes the old entry's
    /// chain position and the displaced handle is returned; `n_obj` is
    /// unchanged. Otherwise a fresh entry is prepended at the chain head and
    /// `n_obj` grows. Either way, the caller is responsible for marking the
    /// referenced object `in_cache` once it is also linked into a tier.
    pub fn insert(&self, obj_id: ObjId, value: V) -> Option<V> {
        let bucket = self.bucket_of(obj_id);
        let mut block = self.pool.lock_for(bucket).write();
        let ci = self.cell_index(bucket);

        let cur = cursor_to(&mut block[ci], obj_id);
        if let Some(entry) = cur.as_mut() {
            return Some(std::mem::replace(&mut entry.value, value));
        }

        let head = block[ci].take();
        block[ci] = Some(Box::new(Entry {
            obj_id,
            value,
            next: head,
        }));
        self.n_obj.fetch_add(1, Ordering::AcqRel);
        None
    }

    /// Unlinks `obj_id` under the bucket's write lock and returns the handle
    /// it mapped to, or `None` if absent.
    pub fn delete(&self, obj_id: ObjId) -> Option<V> {
        let bucket = self.bucket_of(obj_id);
        let mut block = self.pool.lock_for(bucket).write();
        let ci = self.cell_index(bucket);

        let cur = cursor_to(&mut block[ci], obj_id);
        let mut removed = cur.take()?;
        *cur = removed.next.take();
        self.n_obj.fetch_sub(1, Ordering::AcqRel);
        Some(removed.value)
    }

    /// Samples the head entry of a random non-empty bucket. Best-effort:
    /// each probe read-locks only its own bucket, and the search gives up
    /// after a bounded number of probes, so an empty (or very sparse) index
    /// yields `None`. Callers wanting a guaranteed sample must ensure
    /// `n_obj > 0` and retry.
    pub fn random_obj(&self) -> Option<(ObjId, V)> {
        let n_buckets = self.n_buckets();
        let budget = (n_buckets * RANDOM_PROBE_FACTOR).max(RANDOM_PROBE_FLOOR);
        let mut rng = rand::thread_rng();
        for _ in 0..budget {
            let bucket = rng.gen_range(0..n_buckets as u64);
            let block = self.pool.lock_for(bucket).read();
            if let Some(entry) = block[self.cell_index(bucket)].as_ref() {
                return Some((entry.obj_id, entry.value));
            }
        }
        None
    }

    /// Asserts that the entry count matches the sum of chain lengths over
    /// all buckets. Takes every pool lock in turn; callers must hold none.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let mut total = 0u64;
        for lock in self.pool.iter() {
            let block = lock.read();
            for cell in block.iter() {
                let mut cur = cell.as_deref();
                while let Some(entry) = cur {
                    total += 1;
                    cur = entry.next.as_deref();
                }
            }
        }
        assert_eq!(total, self.n_obj(), "n_obj does not match chain lengths");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==============================================
    // Find / insert / delete round trips
    // ==============================================

    #[test]
    fn find_after_insert_then_delete() {
        let index: HashIndex<usize> = HashIndex::new(8);
        assert_eq!(index.find(1), None);

        assert_eq!(index.insert(1, 10), None);
        assert_eq!(index.find(1), Some(10));
        assert_eq!(index.n_obj(), 1);

        assert_eq!(index.delete(1), Some(10));
        assert_eq!(index.find(1), None);
        assert_eq!(index.n_obj(), 0);
        index.debug_validate_invariants();
    }

    #[test]
    fn delete_absent_id_is_none() {
        let index: HashIndex<usize> = HashIndex::new(8);
        index.insert(1, 10);
        assert_eq!(index.delete(2), None);
        assert_eq!(index.n_obj(), 1);
    }

    #[test]
    fn reinsert_replaces_and_keeps_count() {
        let index: HashIndex<usize> = HashIndex::new(8);
        assert_eq!(index.insert(5, 50), None);
        assert_eq!(index.insert(5, 51), Some(50));
        assert_eq!(index.n_obj(), 1);
        assert_eq!(index.find(5), Some(51));
        index.debug_validate_invariants();
    }

    // ==============================================
    // Chain behavior under collisions
    // ==============================================

    #[test]
    fn colliding_ids_share_a_chain() {
        // hashpower 1 forces every id into one of two buckets, so chains
        // grow immediately.
        let index: HashIndex<u64> = HashIndex::new(1);
        for id in 0..32u64 {
            assert_eq!(index.insert(id, id * 10), None);
        }
        assert_eq!(index.n_obj(), 32);
        for id in 0..32u64 {
            assert_eq!(index.find(id), Some(id * 10));
        }
        index.debug_validate_invariants();

        // Unlink from head, middle, and tail positions.
        for id in [31u64, 16, 0] {
            assert_eq!(index.delete(id), Some(id * 10));
            assert_eq!(index.find(id), None);
        }
        assert_eq!(index.n_obj(), 29);
        index.debug_validate_invariants();
    }

    #[test]
    fn entry_count_tracks_chain_lengths_under_churn() {
        let index: HashIndex<u64> = HashIndex::new(4);
        for round in 0..4u64 {
            for id in 0..64u64 {
                index.insert(id, round);
            }
            for id in (0..64u64).step_by(3) {
                index.delete(id);
            }
            index.debug_validate_invariants();
        }
    }

    // ==============================================
    // Pool sizing
    // ==============================================

    #[test]
    fn small_tables_get_a_single_lock() {
        let index: HashIndex<u32> = HashIndex::new(8);
        assert_eq!(index.lock_count(), 1);
        assert_eq!(index.n_buckets(), 256);
    }

    #[test]
    fn lock_count_is_hashpower_minus_ten() {
        let index: HashIndex<u32> = HashIndex::new(12);
        assert_eq!(index.lock_count(), 4);
        assert_eq!(index.n_buckets(), 4096);
    }

    #[test]
    fn hashpower_zero_is_clamped_up() {
        let index: HashIndex<u32> = HashIndex::new(0);
        assert_eq!(index.hashpower(), MIN_HASHPOWER);
        assert_eq!(index.n_buckets(), 2);
    }

    // ==============================================
    // Random sampling
    // ==============================================

    #[test]
    fn random_obj_on_empty_index_exhausts_probes() {
        let index: HashIndex<u32> = HashIndex::new(4);
        assert_eq!(index.random_obj(), None);
    }

    #[test]
    fn random_obj_finds_a_resident_entry() {
        let index: HashIndex<u64> = HashIndex::new(4);
        for id in 0..16u64 {
            index.insert(id, id);
        }
        let (obj_id, value) = index.random_obj().expect("populated index must sample");
        assert_eq!(obj_id, value);
        assert!(index.find(obj_id).is_some());
    }
}
