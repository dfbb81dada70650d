//! Process management
//!
//! - `types`: process control block, states, handles and wait channels
//! - `table`: the global process table and its state transitions
//! - `lifecycle`: userinit, fork, exit, wait, kill, grow
//! - `dump`: lock-free process listing

mod dump;
mod error;
mod lifecycle;
mod table;
mod types;

pub use dump::{procdump, procdump_to_log};
pub use error::ProcError;
pub use lifecycle::{current_pid, exit, fork, grow, kill, killed, userinit, wait, with_current};
pub use table::{ProcTable, Reap, Released, PTABLE};
pub use types::{Channel, Pid, Proc, ProcHandle, ProcState, QueueLevel};
