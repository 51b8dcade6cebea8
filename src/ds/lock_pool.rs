//! Fixed pool of reader/writer locks addressed by hash.
//!
//! Lock striping partitions a lock domain into `2^locks_power` reader/writer
//! locks so that operations on keys mapping to different locks proceed
//! independently. Several hash buckets fan in to each lock; the pool is
//! generic over the state a lock guards so that callers can keep the guarded
//! data inside the lock that protects it.
//!
//! ```text
//!   Lock pool (count = 4)            Hash domain
//!   ┌──────────────────┐
//!   │ rw_lock 0 ─ T    │ ◄── hash & mask == 0
//!   ├──────────────────┤
//!   │ rw_lock 1 ─ T    │ ◄── hash & mask == 1
//!   ├──────────────────┤
//!   │ rw_lock 2 ─ T    │ ◄── hash & mask == 2
//!   ├──────────────────┤
//!   │ rw_lock 3 ─ T    │ ◄── hash & mask == 3
//!   └──────────────────┘
//! ```
//!
//! Acquisition blocks and cannot fail; allocation failure aborts the process.

use parking_lot::RwLock;

/// Pool of `2^locks_power` reader/writer locks, each guarding a `T`.
///
/// Hash `h` maps to lock `h & mask`. The mapping is stable for the life of
/// the pool unless [`expand`](LockPool::expand) is called.
///
/// # Example
///
/// ```
/// use cachesim::ds::lock_pool::LockPool;
///
/// let pool: LockPool<u64> = LockPool::new(2, || 0);
/// assert_eq!(pool.lock_count(), 4);
///
/// // Hashes that agree on the low bits share a lock.
/// assert_eq!(pool.lock_index(5), pool.lock_index(13));
///
/// *pool.lock_for(5).write() += 1;
/// assert_eq!(*pool.lock_for(13).read(), 1);
/// ```
#[derive(Debug)]
pub struct LockPool<T> {
    locks: Box<[RwLock<T>]>,
    mask: u64,
}

impl<T> LockPool<T> {
    /// Allocates `2^locks_power` locks (minimum 1), each initialized with a
    /// fresh value from `init`.
    pub fn new(locks_power: u32, mut init: impl FnMut() -> T) -> Self {
        let count = 1usize << locks_power;
        let locks: Vec<RwLock<T>> = (0..count).map(|_| RwLock::new(init())).collect();
        Self {
            locks: locks.into_boxed_slice(),
            mask: (count - 1) as u64,
        }
    }

    /// Number of locks in the pool.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Mask applied to hashes: `lock_count - 1`.
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Index of the lock that guards `hash`.
    pub fn lock_index(&self, hash: u64) -> usize {
        (hash & self.mask) as usize
    }

    /// The lock that guards `hash`.
    pub fn lock_for(&self, hash: u64) -> &RwLock<T> {
        &self.locks[self.lock_index(hash)]
    }

    /// Mutable access to one lock's state without acquiring it. Exclusive
    /// access to the pool proves no lock is held.
    pub fn state_mut(&mut self, index: usize) -> &mut T {
        self.locks[index].get_mut()
    }

    /// Iterates over the locks in index order.
    pub fn iter(&self) -> impl Iterator<Item = &RwLock<T>> {
        self.locks.iter()
    }

    /// Doubles the lock count. For each existing lock `i`, `split(i, state)`
    /// carves out the state of the new lock `i + old_count`; after the call,
    /// hashes with bit `old_count` set in `hash & mask` move to the new
    /// locks. Requires `&mut self`: exclusive use of the pool is how the
    /// caller proves there are no active lock-holders. Reserved for
    /// rehashing, which [`HashIndex`](crate::ds::hash_index::HashIndex) never
    /// performs online.
    pub fn expand(&mut self, mut split: impl FnMut(usize, &mut T) -> T) {
        let old_count = self.locks.len();
        let mut grown: Vec<RwLock<T>> = std::mem::take(&mut self.locks).into_vec();
        grown.reserve_exact(old_count);
        for i in 0..old_count {
            let carved = split(i, grown[i].get_mut());
            grown.push(RwLock::new(carved));
        }
        self.locks = grown.into_boxed_slice();
        self.mask = (old_count * 2 - 1) as u64;
    }
}
