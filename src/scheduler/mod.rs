//! Scheduler subsystem
//!
//! A multi-level feedback queue with an exclusive override.
//!
//! ## Module Organization
//!
//! - `policy`: ranking of Runnable processes
//! - `core`: per-CPU scheduler loop, `sched`, `yield_now`, `forkret`
//! - `sleep`: sleep/wakeup on channels
//! - `exclusive`: priorities and exclusive mode
//! - `accounting`: tick clock, quantum charging and priority boost

mod accounting;
mod core;
mod exclusive;
mod policy;
mod sleep;

pub use self::core::{sched, scheduler, yield_now};
pub(crate) use self::core::forkret;
pub use accounting::{Charge, ClockEvent, ClockState, TickClock, TICKS};
pub use exclusive::{get_level, monopolize, set_priority, unmonopolize};
pub use policy::{select, Selection, Tier};
pub use sleep::{sleep, sleep_locked, wakeup};
