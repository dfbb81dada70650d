//! Scheduler syscalls (yield, getlev, setpriority, setmonopoly, unmonopolize)
//! and the tick-based sleep/uptime pair.

use super::{arg_int, status};
use crate::param::EXCLUSIVE_LEVEL;
use crate::proc::QueueLevel;
use crate::scheduler::{self, TICKS};

pub(super) fn yield_now() -> i64 {
    scheduler::yield_now();
    0
}

/// Queue level, `EXCLUSIVE_LEVEL` in exclusive mode, -1 without a process.
pub(super) fn getlev() -> i64 {
    match scheduler::get_level() {
        Ok(QueueLevel::Level(level)) => i64::from(level),
        Ok(QueueLevel::Exclusive) => i64::from(EXCLUSIVE_LEVEL),
        Err(err) => i64::from(err.code()),
    }
}

pub(super) fn setpriority(pid: u64, priority: u64) -> i64 {
    status(scheduler::set_priority(arg_int(pid), arg_int(priority)).map(|()| 0))
}

pub(super) fn setmonopoly(pid: u64, password: u64) -> i64 {
    let password = password as u32;
    status(scheduler::monopolize(arg_int(pid), password).map(|count| count as i64))
}

pub(super) fn unmonopolize() -> i64 {
    scheduler::unmonopolize();
    0
}

pub(super) fn sleep(ticks: u64) -> i64 {
    let ticks = arg_int(ticks).max(0) as u64;
    status(TICKS.sleep(ticks).map(|()| 0))
}

pub(super) fn uptime() -> i64 {
    TICKS.now().uptime as i64
}
