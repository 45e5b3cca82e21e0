//! Event bus adapters.
//!
//! - `InMemoryEventBus` - in-process bus with bounded history and live
//!   subscribers
mod in_memory;

pub use in_memory::InMemoryEventBus;
