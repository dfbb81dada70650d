//! Process table
//!
//! A fixed arena of [`Proc`] slots plus the per-level ready counters. Every
//! method here is a plain state transition on the table; callers hold
//! [`PTABLE`]'s lock (or own a private table in tests) and do any collaborator
//! work outside.
//!
//! The ready counters are maintained on every transition into and out of
//! Runnable: `ready[L]` always equals the number of Runnable, non-monopolized
//! slots at level `L`.

use core::ops::{Index, IndexMut};

use lazy_static::lazy_static;

use super::types::{Channel, Pid, Proc, ProcHandle, ProcState};
use super::ProcError;
use crate::mm::{AddressSpace, KernelStack};
use crate::param::{DEFAULT_PRIORITY, MLFQ_LEVELS, NPROC};
use crate::sync::SpinLock;

lazy_static! {
    /// The global process table
    pub static ref PTABLE: SpinLock<ProcTable> = SpinLock::new("ptable", ProcTable::new());
}

/// Resources of a reaped slot, to be returned to their collaborators
#[derive(Debug, PartialEq, Eq)]
pub struct Released {
    pub pid: Pid,
    pub kstack: Option<KernelStack>,
    pub space: Option<AddressSpace>,
}

/// Outcome of one scan for a finished child
#[derive(Debug, PartialEq, Eq)]
pub enum Reap {
    Reaped(Released),
    /// Children exist but none has exited yet
    Pending,
    NoChildren,
}

pub struct ProcTable {
    pub(crate) procs: [Proc; NPROC],
    pub(crate) ready: [usize; MLFQ_LEVELS],
    pub(crate) exclusive: usize,
    next_pid: Pid,
    init: Option<ProcHandle>,
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcTable {
    pub fn new() -> Self {
        Self {
            procs: core::array::from_fn(|_| Proc::unused()),
            ready: [0; MLFQ_LEVELS],
            exclusive: 0,
            next_pid: 1,
            init: None,
        }
    }

    fn handle_at(&self, index: usize) -> ProcHandle {
        ProcHandle::new(index, self.procs[index].generation)
    }

    /// The live process behind `handle`, if the slot has not been reaped since.
    pub fn get(&self, handle: ProcHandle) -> Option<&Proc> {
        self.procs
            .get(handle.index())
            .filter(|p| p.generation == handle.generation() && p.state != ProcState::Unused)
    }

    pub fn get_mut(&mut self, handle: ProcHandle) -> Option<&mut Proc> {
        self.procs
            .get_mut(handle.index())
            .filter(|p| p.generation == handle.generation() && p.state != ProcState::Unused)
    }

    /// Every slot in scan order, used or not.
    pub fn slots(&self) -> impl Iterator<Item = (ProcHandle, &Proc)> + '_ {
        self.procs
            .iter()
            .enumerate()
            .map(|(index, p)| (ProcHandle::new(index, p.generation), p))
    }

    /// Slots holding a process.
    pub fn iter(&self) -> impl Iterator<Item = (ProcHandle, &Proc)> + '_ {
        self.slots().filter(|(_, p)| p.state != ProcState::Unused)
    }

    pub fn find(&self, pid: Pid) -> Option<ProcHandle> {
        if pid <= 0 {
            return None;
        }
        self.iter().find(|(_, p)| p.pid == pid).map(|(h, _)| h)
    }

    pub fn ready_count(&self, level: u8) -> usize {
        self.ready.get(level as usize).copied().unwrap_or(0)
    }

    pub fn exclusive_count(&self) -> usize {
        self.exclusive
    }

    pub fn init_process(&self) -> Option<ProcHandle> {
        self.init
    }

    pub fn set_init_process(&mut self, handle: ProcHandle) {
        self.init = Some(handle);
    }

    /// Ready counters recomputed from the slots.
    pub fn counted_ready(&self) -> [usize; MLFQ_LEVELS] {
        let mut counts = [0; MLFQ_LEVELS];
        for (_, p) in self.iter().filter(|(_, p)| p.is_queued()) {
            counts[p.level as usize] += 1;
        }
        counts
    }

    pub fn ready_counts_consistent(&self) -> bool {
        self.counted_ready() == self.ready
    }

    /// Channel a parent sleeps on while waiting for its children.
    pub fn wait_channel(&self, handle: ProcHandle) -> Channel {
        Channel::of(&self.procs[handle.index()])
    }

    /// Claims an unused slot as an Embryo with a fresh pid.
    pub fn alloc(&mut self) -> Option<ProcHandle> {
        let index = self.procs.iter().position(|p| p.state == ProcState::Unused)?;
        let pid = self.next_pid;
        self.next_pid += 1;

        let p = &mut self.procs[index];
        p.clear();
        p.state = ProcState::Embryo;
        p.pid = pid;
        p.priority = DEFAULT_PRIORITY;
        Some(self.handle_at(index))
    }

    /// Returns a slot to Unused and hands back what it owned.
    pub fn release(&mut self, handle: ProcHandle) -> Released {
        let p = &mut self[handle];
        let queued = p.is_queued().then_some(p.level as usize);
        let exclusive = p.monopolize;
        let released = Released {
            pid: p.pid,
            kstack: p.kstack.take(),
            space: p.space.take(),
        };
        p.clear();
        p.generation = p.generation.wrapping_add(1);

        if let Some(level) = queued {
            self.ready[level] -= 1;
        }
        if exclusive {
            self.exclusive -= 1;
        }
        released
    }

    /// Marks `handle` Runnable and counts it toward its level.
    pub fn make_runnable(&mut self, handle: ProcHandle) {
        let p = &mut self[handle];
        if p.state == ProcState::Runnable {
            return;
        }
        p.state = ProcState::Runnable;
        if !p.monopolize {
            let level = p.level as usize;
            self.ready[level] += 1;
        }
    }

    /// Runnable to Running on behalf of a scheduler loop.
    pub fn dispatch(&mut self, handle: ProcHandle) {
        let p = &mut self[handle];
        if p.state != ProcState::Runnable {
            kpanic!("dispatch: pid {} is {:?}", p.pid, p.state);
        }
        p.state = ProcState::Running;
        if !p.monopolize {
            let level = p.level as usize;
            match self.ready[level].checked_sub(1) {
                Some(count) => self.ready[level] = count,
                None => kpanic!("dispatch: ready count underflow at level {}", level),
            }
        }
    }

    pub fn block(&mut self, handle: ProcHandle, chan: Channel) {
        let p = &mut self[handle];
        p.chan = Some(chan);
        p.state = ProcState::Sleeping;
    }

    /// Makes every process sleeping on `chan` Runnable; returns how many woke.
    pub fn wakeup(&mut self, chan: Channel) -> usize {
        let mut woken = 0;
        for index in 0..NPROC {
            let p = &self.procs[index];
            if p.state == ProcState::Sleeping && p.chan == Some(chan) {
                let handle = self.handle_at(index);
                self.make_runnable(handle);
                woken += 1;
            }
        }
        woken
    }

    /// Flags `pid` for termination, waking it if asleep.
    pub fn kill(&mut self, pid: Pid) -> Result<(), ProcError> {
        let handle = self.find(pid).ok_or(ProcError::NotFound)?;
        self[handle].killed = true;
        if self[handle].state == ProcState::Sleeping {
            self.make_runnable(handle);
        }
        Ok(())
    }

    /// Turns an exiting process into a Zombie: wakes its parent and hands
    /// its children to init.
    pub fn retire(&mut self, handle: ProcHandle) {
        if let Some(parent) = self[handle].parent {
            self.wakeup(self.wait_channel(parent));
        }

        let init = self.init;
        let mut orphaned_zombie = false;
        for p in self.procs.iter_mut() {
            if p.state != ProcState::Unused && p.parent == Some(handle) {
                p.parent = init;
                orphaned_zombie |= p.state == ProcState::Zombie;
            }
        }
        if let (true, Some(init)) = (orphaned_zombie, init) {
            self.wakeup(self.wait_channel(init));
        }

        self[handle].state = ProcState::Zombie;
    }

    /// Reaps one Zombie child of `parent`, if any.
    pub fn reap_child(&mut self, parent: ProcHandle) -> Reap {
        let mut have_children = false;
        for index in 0..NPROC {
            let p = &self.procs[index];
            if p.state == ProcState::Unused || p.parent != Some(parent) {
                continue;
            }
            have_children = true;
            if p.state == ProcState::Zombie {
                let child = self.handle_at(index);
                return Reap::Reaped(self.release(child));
            }
        }
        if have_children {
            Reap::Pending
        } else {
            Reap::NoChildren
        }
    }
}

impl Index<ProcHandle> for ProcTable {
    type Output = Proc;

    fn index(&self, handle: ProcHandle) -> &Proc {
        match self.procs.get(handle.index()) {
            Some(p) if p.generation == handle.generation() => p,
            _ => kpanic!("stale process handle {:?}", handle),
        }
    }
}

impl IndexMut<ProcHandle> for ProcTable {
    fn index_mut(&mut self, handle: ProcHandle) -> &mut Proc {
        match self.procs.get_mut(handle.index()) {
            Some(p) if p.generation == handle.generation() => p,
            _ => kpanic!("stale process handle {:?}", handle),
        }
    }
}
