//! Background services.

mod timeout_sweeper;

pub use timeout_sweeper::{TimeoutSweeper, TimeoutSweeperConfig};
