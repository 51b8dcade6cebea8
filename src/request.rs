//! The unit of simulated cache traffic.
//!
//! A [`Request`] is one reference from a trace: an object id, the object's
//! byte size, the logical clock at which the reference happens, and an
//! optional per-request TTL. Trace readers and request encoders live in the
//! simulator drivers; the core only consumes the decoded form.

use crate::obj::ObjId;

/// One simulated cache reference.
///
/// # Example
///
/// ```
/// use cachesim::request::Request;
///
/// let req = Request::new(42, 1024).at(7).with_ttl(300);
/// assert_eq!(req.obj_id, 42);
/// assert_eq!(req.obj_size, 1024);
/// assert_eq!(req.time, 7);
/// assert_eq!(req.ttl, Some(300));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Object identifier, unique within a trace.
    pub obj_id: ObjId,

    /// Object size in bytes, counted toward tier occupancy.
    pub obj_size: u64,

    /// Logical clock of the reference. Only consulted for expiration.
    pub time: u64,

    /// Per-request TTL. Overrides the cache-wide default when set.
    pub ttl: Option<u64>,
}

impl Request {
    /// Creates a request at logical time 0 with no TTL.
    pub fn new(obj_id: ObjId, obj_size: u64) -> Self {
        Self {
            obj_id,
            obj_size,
            time: 0,
            ttl: None,
        }
    }

    /// Sets the logical clock of the reference.
    pub fn at(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    /// Sets a per-request TTL.
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let req = Request::new(1, 8).at(100).with_ttl(60);
        assert_eq!(req.time, 100);
        assert_eq!(req.ttl, Some(60));
    }

    #[test]
    fn defaults_are_zero_time_no_ttl() {
        let req = Request::new(9, 16);
        assert_eq!(req.time, 0);
        assert_eq!(req.ttl, None);
    }
}
