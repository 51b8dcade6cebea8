pub mod hash_index;
pub mod lock_pool;
pub mod obj_arena;

pub use hash_index::HashIndex;
pub use lock_pool::LockPool;
pub use obj_arena::{ObjArena, ObjRef};
