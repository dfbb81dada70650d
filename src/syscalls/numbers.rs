//! System call numbers
//!
//! The classic xv6 numbering, followed by the scheduler calls.

pub const SYS_FORK: u64 = 1;
pub const SYS_EXIT: u64 = 2;
pub const SYS_WAIT: u64 = 3;
pub const SYS_KILL: u64 = 6;
pub const SYS_GETPID: u64 = 11;
pub const SYS_SBRK: u64 = 12;
pub const SYS_SLEEP: u64 = 13;
pub const SYS_UPTIME: u64 = 14;

// Scheduler control
pub const SYS_YIELD: u64 = 22;
pub const SYS_GETLEV: u64 = 23;
pub const SYS_SETPRIORITY: u64 = 24;
pub const SYS_SETMONOPOLY: u64 = 25;
pub const SYS_UNMONOPOLIZE: u64 = 26;
