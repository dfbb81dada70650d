//! Kernel parameters
//!
//! Compile-time sizing and scheduling constants shared by every subsystem.

/// Maximum number of process table slots
pub const NPROC: usize = 64;

/// Maximum number of CPUs
pub const NCPU: usize = 8;

/// Open files per process
pub const NOFILE: usize = 16;

/// Size of one physical page, also the kernel stack size
pub const PGSIZE: usize = 4096;

/// Length of a process name including the terminating NUL
pub const PROC_NAME_LEN: usize = 16;

/// Number of MLFQ levels; level 0 is the most favoured
pub const MLFQ_LEVELS: usize = 4;

/// The priority-ordered bottom level
pub const LOWEST_LEVEL: u8 = (MLFQ_LEVELS - 1) as u8;

/// Highest priority a process can request at the bottom level
pub const MAX_PRIORITY: u8 = 10;

/// Priority given to fresh processes
pub const DEFAULT_PRIORITY: u8 = 0;

/// Ticks between two global priority boosts
pub const BOOST_INTERVAL: u32 = 100;

/// Shared secret required to grant exclusive mode
pub const MONOPOLY_PASSWORD: u32 = 2021057301;

/// Value reported by `getlev` for a process running in exclusive mode
pub const EXCLUSIVE_LEVEL: i32 = 99;

/// The CPU that owns the tick counter
pub const TIMEKEEPER_CPU: usize = 0;

/// Time slice, in ticks, of an MLFQ level
pub const fn quantum(level: u8) -> u32 {
    2 * level as u32 + 2
}
