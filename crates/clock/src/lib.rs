//! Frame Clock: elapsed time between frames and a rolling one-second FPS counter.
//!
//! # Invariants
//! - Frame delta and elapsed time are never negative, even when the timer
//!   source steps backwards.
//! - The timer frequency is captured once per `start()` and used for every
//!   conversion until the next one.

mod clock;
mod source;

pub use clock::{FrameClock, FrameTick};
pub use source::{ManualTimeSource, SystemTimeSource, TimeSource};
