//! Process management syscalls (fork, exit, wait, kill, getpid, sbrk)

use super::{arg_int, status};
use crate::proc;

pub(super) fn fork() -> i64 {
    status(proc::fork().map(i64::from))
}

pub(super) fn exit() -> ! {
    proc::exit()
}

pub(super) fn wait() -> i64 {
    status(proc::wait().map(i64::from))
}

pub(super) fn kill(pid: u64) -> i64 {
    status(proc::kill(arg_int(pid)).map(|()| 0))
}

pub(super) fn getpid() -> i64 {
    proc::current_pid().map_or(-1, i64::from)
}

pub(super) fn sbrk(delta: u64) -> i64 {
    let delta = arg_int(delta) as isize;
    status(proc::grow(delta).map(|old| old as i64))
}
