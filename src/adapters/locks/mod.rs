//! Keyed lock adapters.
//!
//! - `InProcessKeyedLock` - tokio mutex per key, single instance only
//! - `RedisKeyedLock` - `SET NX PX` lease with compare-and-delete release,
//!   shared across instances

mod in_process;
mod redis;

pub use self::in_process::InProcessKeyedLock;
pub use self::redis::RedisKeyedLock;
