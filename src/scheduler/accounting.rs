//! Timer-driven accounting
//!
//! The timekeeping CPU advances [`TICKS`] once per timer interrupt. Every
//! `BOOST_INTERVAL` ticks the clock reports a boost instead of a plain tick,
//! and the caller applies it to the process table. Uptime keeps counting
//! across boosts for sleepers.

use super::sleep::sleep;
use crate::param::{quantum, BOOST_INTERVAL, LOWEST_LEVEL, MLFQ_LEVELS};
use crate::proc::{Channel, ProcError, ProcHandle, ProcState, ProcTable};
use crate::sync::SpinLock;

/// What one timer interrupt means for the process table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockEvent {
    Tick,
    Boost,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockState {
    /// Ticks since the last boost
    pub since_boost: u32,
    /// Ticks since boot
    pub uptime: u64,
}

/// Single-writer tick counter with its own lock
pub struct TickClock {
    state: SpinLock<ClockState>,
}

impl TickClock {
    pub const fn new() -> Self {
        Self {
            state: SpinLock::new(
                "ticks",
                ClockState {
                    since_boost: 0,
                    uptime: 0,
                },
            ),
        }
    }

    /// Counts one tick, wrapping to zero and reporting a boost at the interval.
    pub fn advance(&self) -> ClockEvent {
        let mut state = self.state.lock();
        state.uptime += 1;
        state.since_boost += 1;
        if state.since_boost >= BOOST_INTERVAL {
            state.since_boost = 0;
            ClockEvent::Boost
        } else {
            ClockEvent::Tick
        }
    }

    pub fn now(&self) -> ClockState {
        *self.state.lock()
    }

    /// Channel woken on every tick
    pub fn channel(&self) -> Channel {
        Channel::of(self)
    }

    /// Blocks the caller for `ticks` timer ticks.
    ///
    /// Gives up early with `ProcError::Killed` if the caller is killed.
    pub fn sleep(&self, ticks: u64) -> Result<(), ProcError> {
        let mut state = self.state.lock();
        let start = state.uptime;
        while state.uptime - start < ticks {
            if crate::proc::killed() {
                return Err(ProcError::Killed);
            }
            state = sleep(self.channel(), state);
        }
        Ok(())
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

pub static TICKS: TickClock = TickClock::new();

/// Effect of charging one tick to a running process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charge {
    /// Exclusive processes do not age
    Frozen,
    /// Still inside its slice
    Used { tick: u32 },
    Demoted { from: u8, to: u8 },
    /// Slice exhausted at the lowest level
    Decayed { priority: u8 },
}

impl ProcTable {
    /// Moves every process back to level 0 and recounts the ready queues.
    ///
    /// Exclusive processes keep their flag and stay out of the counts.
    pub fn boost(&mut self) {
        for p in self.procs.iter_mut() {
            p.level = 0;
            p.tick = 0;
        }
        let queued = self.procs.iter().filter(|p| p.is_queued()).count();
        self.ready = [0; MLFQ_LEVELS];
        self.ready[0] = queued;
    }

    /// Charges one tick to `handle` if it is running.
    pub fn charge_tick(&mut self, handle: ProcHandle) -> Option<Charge> {
        let p = self.get_mut(handle)?;
        if p.state != ProcState::Running {
            return None;
        }
        if p.monopolize {
            p.tick = 0;
            return Some(Charge::Frozen);
        }

        p.tick += 1;
        if p.tick < quantum(p.level) {
            return Some(Charge::Used { tick: p.tick });
        }

        p.tick = 0;
        let from = p.level;
        match from {
            0 => {
                p.level = if p.pid % 2 == 1 { 1 } else { 2 };
            }
            level if level < LOWEST_LEVEL => p.level = LOWEST_LEVEL,
            _ => {
                p.priority = p.priority.saturating_sub(1);
                return Some(Charge::Decayed {
                    priority: p.priority,
                });
            }
        }
        Some(Charge::Demoted { from, to: p.level })
    }
}
