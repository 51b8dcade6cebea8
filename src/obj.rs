//! Cached-object metadata.
//!
//! An [`Obj`] is the bookkeeping node a tier keeps for one resident object:
//! identity, size, the expiration deadline stamped at admission, and the
//! intrusive recency links. All `Obj` nodes live in their tier's arena
//! ([`ObjArena`](crate::ds::obj_arena::ObjArena)); the hash index refers to
//! them through non-owning [`ObjRef`](crate::ds::obj_arena::ObjRef) handles.
//! The core never owns object payloads, only this metadata.

use crate::ds::obj_arena::ObjRef;
use crate::request::Request;

/// Object identifier, unique within a cache instance.
pub type ObjId = u64;

/// Metadata node for one cached object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obj {
    /// Object identifier.
    pub obj_id: ObjId,

    /// Byte size counted toward tier occupancy.
    pub obj_size: u64,

    /// True while the node is linked into some tier's recency list.
    pub(crate) in_cache: bool,

    /// Logical clock at which the object expires, if it does.
    pub(crate) expire_at: Option<u64>,

    /// Recency-list link toward the MRU end.
    pub(crate) lru_prev: Option<ObjRef>,

    /// Recency-list link toward the LRU end.
    pub(crate) lru_next: Option<ObjRef>,
}

impl Obj {
    /// Builds a detached node from a request. `default_ttl` applies when the
    /// request carries no TTL of its own; the expiration deadline is stamped
    /// relative to the request's logical clock.
    pub(crate) fn from_request(req: &Request, default_ttl: Option<u64>) -> Self {
        let ttl = req.ttl.or(default_ttl);
        Self {
            obj_id: req.obj_id,
            obj_size: req.obj_size,
            in_cache: false,
            expire_at: ttl.map(|t| req.time.saturating_add(t)),
            lru_prev: None,
            lru_next: None,
        }
    }

    /// True while the node is a member of some tier's residency set.
    pub fn in_cache(&self) -> bool {
        self.in_cache
    }

    /// True once the logical clock has reached the expiration deadline.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expire_at.is_some_and(|deadline| now >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_request_prefers_request_ttl() {
        let req = Request::new(1, 10).at(100).with_ttl(5);
        let obj = Obj::from_request(&req, Some(50));
        assert_eq!(obj.expire_at, Some(105));
    }

    #[test]
    fn from_request_falls_back_to_default_ttl() {
        let req = Request::new(1, 10).at(100);
        let obj = Obj::from_request(&req, Some(50));
        assert_eq!(obj.expire_at, Some(150));

        let no_ttl = Obj::from_request(&req, None);
        assert_eq!(no_ttl.expire_at, None);
        assert!(!no_ttl.is_expired(u64::MAX));
    }

    #[test]
    fn expiry_is_inclusive_of_deadline() {
        let obj = Obj::from_request(&Request::new(1, 10).with_ttl(10), None);
        assert!(!obj.is_expired(9));
        assert!(obj.is_expired(10));
        assert!(obj.is_expired(11));
    }

    #[test]
    fn new_node_is_detached() {
        let obj = Obj::from_request(&Request::new(7, 1), None);
        assert!(!obj.in_cache());
        assert_eq!(obj.lru_prev, None);
        assert_eq!(obj.lru_next, None);
    }
}
