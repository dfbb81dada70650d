//! Syscall subsystem
//!
//! - `numbers`: syscall number constants
//! - `process`: fork, exit, wait, kill, getpid, sbrk
//! - `sched`: scheduler control, sleep and uptime
//!
//! Every call returns the xv6 integer convention: a non-negative result, or
//! a negative code from [`ProcError::code`].

mod numbers;
mod process;
mod sched;

pub use numbers::*;

use crate::proc::{self, ProcError};

/// Runs system call `nr` for the current process.
pub fn syscall_dispatch(nr: u64, arg1: u64, arg2: u64) -> i64 {
    match nr {
        SYS_FORK => process::fork(),
        SYS_EXIT => process::exit(),
        SYS_WAIT => process::wait(),
        SYS_KILL => process::kill(arg1),
        SYS_GETPID => process::getpid(),
        SYS_SBRK => process::sbrk(arg1),
        SYS_SLEEP => sched::sleep(arg1),
        SYS_UPTIME => sched::uptime(),
        SYS_YIELD => sched::yield_now(),
        SYS_GETLEV => sched::getlev(),
        SYS_SETPRIORITY => sched::setpriority(arg1, arg2),
        SYS_SETMONOPOLY => sched::setmonopoly(arg1, arg2),
        SYS_UNMONOPOLIZE => sched::unmonopolize(),
        _ => {
            kwarn!(
                "pid {}: unknown sys call {}",
                proc::current_pid().unwrap_or(0),
                nr
            );
            -1
        }
    }
}

fn status(result: Result<i64, ProcError>) -> i64 {
    result.unwrap_or_else(|err| i64::from(err.code()))
}

/// User integers are 32-bit.
fn arg_int(raw: u64) -> i32 {
    raw as u32 as i32
}
