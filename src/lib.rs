//! cachesim: segmented LRU eviction and concurrent indexing primitives for
//! cache simulation.
//!
//! Two cooperating subsystems: the [`policy`] module implements the
//! Segmented LRU ([`SlruCache`]) over single-tier [`LruTier`] primitives,
//! and the [`ds`] module supplies the concurrent chained
//! [`HashIndex`](ds::hash_index::HashIndex) with its striped
//! [`LockPool`](ds::lock_pool::LockPool). Simulator drivers feed
//! [`Request`]s through the [`EvictionPolicy`](traits::EvictionPolicy)
//! capability trait; trace decoding and statistics live with the drivers,
//! not here.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod config;
pub mod ds;
pub mod error;
pub mod obj;
pub mod policy;
pub mod prelude;
pub mod request;
pub mod traits;

pub use config::{CacheParams, SlruParams};
pub use error::{ConfigError, InvariantError};
pub use obj::{Obj, ObjId};
pub use policy::lru::LruTier;
pub use policy::slru::{ConcurrentSlruCache, SlruCache};
pub use request::Request;
pub use traits::{CheckResult, EvictionPolicy};
