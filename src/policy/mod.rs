pub mod lru;
pub mod slru;

pub use lru::LruTier;
pub use slru::{ConcurrentSlruCache, SlruCache};
