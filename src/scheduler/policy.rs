//! Dispatch policy
//!
//! Every Runnable slot gets a [`Rank`]; the scheduler runs the minimum.
//! The derived ordering on `Rank` is the whole policy:
//!
//! 1. exclusive processes, round-robin from the scan cursor
//! 2. levels 0..LOWEST_LEVEL in order, round-robin from the scan cursor,
//!    each gated on its ready counter
//! 3. the lowest level, highest priority first, then lowest pid

use core::cmp::Reverse;

use crate::param::{LOWEST_LEVEL, NPROC};
use crate::proc::{Pid, Proc, ProcHandle, ProcState, ProcTable};

/// Which rule picked a process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Exclusive,
    RoundRobin(u8),
    Priority,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub handle: ProcHandle,
    pub tier: Tier,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Exclusive { distance: usize },
    RoundRobin { level: u8, distance: usize },
    Priority { priority: Reverse<u8>, pid: Pid },
}

impl Rank {
    fn tier(self) -> Tier {
        match self {
            Rank::Exclusive { .. } => Tier::Exclusive,
            Rank::RoundRobin { level, .. } => Tier::RoundRobin(level),
            Rank::Priority { .. } => Tier::Priority,
        }
    }
}

/// Picks the next process to run, scanning round-robin tiers from `cursor`.
pub fn select(table: &ProcTable, cursor: usize) -> Option<Selection> {
    table
        .slots()
        .filter(|(_, p)| p.state == ProcState::Runnable)
        .filter_map(|(handle, p)| rank(table, handle, p, cursor).map(|rank| (rank, handle)))
        .min_by_key(|&(rank, _)| rank)
        .map(|(rank, handle)| Selection {
            handle,
            tier: rank.tier(),
        })
}

fn rank(table: &ProcTable, handle: ProcHandle, p: &Proc, cursor: usize) -> Option<Rank> {
    let distance = (handle.index() + NPROC - cursor % NPROC) % NPROC;
    if p.monopolize {
        Some(Rank::Exclusive { distance })
    } else if p.level < LOWEST_LEVEL {
        (table.ready_count(p.level) > 0).then_some(Rank::RoundRobin {
            level: p.level,
            distance,
        })
    } else {
        Some(Rank::Priority {
            priority: Reverse(p.priority),
            pid: p.pid,
        })
    }
}
