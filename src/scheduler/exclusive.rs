//! Priority control and exclusive ("monopolize") mode
//!
//! An exclusive process is dispatched ahead of every ordinary level and is
//! left out of the ready counters until it gives the mode back.

use super::core::sched;
use crate::cpu::myproc;
use crate::param::{MAX_PRIORITY, MONOPOLY_PASSWORD};
use crate::proc::{Pid, ProcError, ProcHandle, ProcState, ProcTable, QueueLevel, PTABLE};

impl ProcTable {
    pub fn set_priority(&mut self, pid: Pid, priority: i32) -> Result<(), ProcError> {
        let priority = u8::try_from(priority)
            .ok()
            .filter(|&p| p <= MAX_PRIORITY)
            .ok_or(ProcError::PriorityOutOfRange)?;
        let handle = self.find(pid).ok_or(ProcError::NotFound)?;
        self[handle].priority = priority;
        Ok(())
    }

    /// Grants exclusive mode to `pid` on behalf of `caller`; returns the
    /// number of exclusive processes afterwards.
    pub fn monopolize(
        &mut self,
        caller: Option<Pid>,
        pid: Pid,
        password: u32,
    ) -> Result<usize, ProcError> {
        if caller == Some(pid) {
            return Err(ProcError::SelfTarget);
        }
        let handle = self.find(pid).ok_or(ProcError::NotFound)?;
        if password != MONOPOLY_PASSWORD {
            return Err(ProcError::BadSecret);
        }

        let p = &mut self[handle];
        if p.monopolize {
            return Err(ProcError::AlreadyExclusive);
        }
        let queued = p.is_queued();
        let level = p.level as usize;
        p.monopolize = true;

        if queued {
            self.ready[level] -= 1;
        }
        self.exclusive += 1;
        Ok(self.exclusive)
    }

    /// Drops exclusive mode for `handle`. Returns false if it was not exclusive.
    pub fn unmonopolize(&mut self, handle: ProcHandle) -> bool {
        let p = &mut self[handle];
        if !p.monopolize {
            return false;
        }
        p.monopolize = false;
        let requeue = (p.state == ProcState::Runnable).then_some(p.level as usize);

        if let Some(level) = requeue {
            self.ready[level] += 1;
        }
        self.exclusive -= 1;
        true
    }

    pub fn queue_level(&self, handle: ProcHandle) -> QueueLevel {
        let p = &self[handle];
        if p.monopolize {
            QueueLevel::Exclusive
        } else {
            QueueLevel::Level(p.level)
        }
    }
}

/// Sets the lowest-level priority of `pid`, 0 through `MAX_PRIORITY`.
pub fn set_priority(pid: Pid, priority: i32) -> Result<(), ProcError> {
    PTABLE.lock().set_priority(pid, priority)
}

/// Where the calling process is queued.
pub fn get_level() -> Result<QueueLevel, ProcError> {
    let handle = myproc().ok_or(ProcError::NoProcess)?;
    Ok(PTABLE.lock().queue_level(handle))
}

/// Puts `pid` in exclusive mode if `password` matches.
pub fn monopolize(pid: Pid, password: u32) -> Result<usize, ProcError> {
    let caller = myproc();
    let mut table = PTABLE.lock();
    let caller = caller.and_then(|handle| table.get(handle)).map(|p| p.pid);
    let count = table.monopolize(caller, pid, password)?;
    kdebug!("monopolize: pid {} is exclusive ({} total)", pid, count);
    Ok(count)
}

/// Gives up exclusive mode and rejoins the ordinary queues.
///
/// Does nothing for a process that is not exclusive.
pub fn unmonopolize() {
    let Some(handle) = myproc() else {
        return;
    };
    let mut table = PTABLE.lock();
    if !table.unmonopolize(handle) {
        return;
    }
    kdebug!("unmonopolize: pid {} back at level {}", table[handle].pid, table[handle].level);
    table.make_runnable(handle);
    sched(&mut table);
}
