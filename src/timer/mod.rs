//! Timer Module - async timers with non-overlapping execution
//!
//! - `RescheduledTimer`: next tick scheduled after the previous one finishes
//! - `ExclusiveTicker`: fixed period, ticks skipped while the action is busy

mod exclusive;
mod rescheduled;

pub use exclusive::{invoke_exclusive, ExclusiveTicker};
pub use rescheduled::{RescheduledTimer, TimerCallback, TimerState};
