//! Sleep and wakeup
//!
//! A sleeper always holds the table lock from the moment it records its
//! channel until it is off the CPU, and `wakeup` needs the same lock to scan,
//! so a wakeup can never fall between the condition check and the sleep.

use super::core::sched;
use crate::cpu::myproc;
use crate::proc::{Channel, ProcTable, PTABLE};
use crate::sync::SpinLockGuard;

/// Atomically releases `guard` and sleeps on `chan`; reacquires the same
/// lock before returning.
///
/// Conditions protected by the table lock itself go through [`sleep_locked`].
pub fn sleep<'a, T>(chan: Channel, guard: SpinLockGuard<'a, T>) -> SpinLockGuard<'a, T> {
    let lock = SpinLockGuard::lock_ref(&guard);

    // Once the table lock is held no wakeup can run, so the caller's lock
    // can go.
    let table = PTABLE.lock();
    drop(guard);

    let table = sleep_locked(chan, table);
    drop(table);

    lock.lock()
}

/// Sleeps on `chan` with the table lock already held.
pub fn sleep_locked<'a>(
    chan: Channel,
    mut table: SpinLockGuard<'a, ProcTable>,
) -> SpinLockGuard<'a, ProcTable> {
    let Some(handle) = myproc() else {
        kpanic!("sleep: no current process");
    };

    table.block(handle, chan);
    sched(&mut table);
    table[handle].chan = None;
    table
}

/// Wakes every process sleeping on `chan`.
pub fn wakeup(chan: Channel) {
    let woken = PTABLE.lock().wakeup(chan);
    if woken > 0 {
        ktrace!("wakeup: {} process(es) on {:#x}", woken, chan.key());
    }
}
