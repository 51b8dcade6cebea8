//! Arena storage for object metadata with stable `ObjRef` handles.
//!
//! Stores [`Obj`](crate::obj::Obj) nodes in a `Vec<Option<Obj>>` and reuses
//! freed slots via a free list. Handles stay valid until their slot is
//! removed, so the recency list and the hash index can both refer to a
//! resident through the same `ObjRef` without per-operation allocation.
//!
//! ```text
//!   slot:  0      1      2      3
//!          [Obj]  [ ]    [Obj]  [ ]
//!                  ^             ^
//!                  └── free_list = [1, 3]
//! ```
//!
//! The arena is the single owner of every node; eviction and removal return
//! the `Obj` by value, transferring ownership to the caller.

use crate::obj::Obj;

/// Stable handle into an [`ObjArena`].
///
/// An `ObjRef` remains valid until the referenced slot is removed; after
/// removal the numeric index may be reused by a later insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(pub(crate) usize);

impl ObjRef {
    /// Returns the underlying slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena that owns all `Obj` nodes of one tier.
#[derive(Debug, Default)]
pub struct ObjArena {
    slots: Vec<Option<Obj>>,
    free_list: Vec<usize>,
    len: usize,
}

impl ObjArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty arena with reserved slot capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Inserts a node and returns its handle.
    pub fn insert(&mut self, obj: Obj) -> ObjRef {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(obj);
            idx
        } else {
            self.slots.push(Some(obj));
            self.slots.len() - 1
        };
        self.len += 1;
        ObjRef(idx)
    }

    /// Removes the node at `r` and returns it, or `None` if the slot is
    /// empty or out of bounds.
    pub fn remove(&mut self, r: ObjRef) -> Option<Obj> {
        let slot = self.slots.get_mut(r.0)?;
        let obj = slot.take()?;
        self.free_list.push(r.0);
        self.len -= 1;
        Some(obj)
    }

    /// Shared access to the node at `r`, if live.
    pub fn get(&self, r: ObjRef) -> Option<&Obj> {
        self.slots.get(r.0).and_then(|slot| slot.as_ref())
    }

    /// Mutable access to the node at `r`, if live.
    pub fn get_mut(&mut self, r: ObjRef) -> Option<&mut Obj> {
        self.slots.get_mut(r.0).and_then(|slot| slot.as_mut())
    }

    /// True if `r` currently refers to a live node.
    pub fn contains(&self, r: ObjRef) -> bool {
        self.slots.get(r.0).is_some_and(|slot| slot.is_some())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no node is live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let live_count = self.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(self.len, live_count);

        let mut seen_free = std::collections::HashSet::new();
        for &idx in &self.free_list {
            assert!(idx < self.slots.len());
            assert!(self.slots[idx].is_none());
            assert!(seen_free.insert(idx));
        }

        assert_eq!(self.slots.len(), self.free_list.len() + self.len);
    }
}
