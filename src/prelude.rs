pub use crate::config::{CacheParams, SlruParams};
pub use crate::ds::{HashIndex, LockPool, ObjArena, ObjRef};
pub use crate::obj::{Obj, ObjId};
pub use crate::policy::{ConcurrentSlruCache, LruTier, SlruCache};
pub use crate::request::Request;
pub use crate::traits::{CheckResult, EvictionPolicy};
