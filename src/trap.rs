//! Scheduler side of trap handling
//!
//! The interrupt entry code saves state and calls in here with interrupts
//! disabled. Killed processes are stopped at these points on their way back
//! to user mode.

use crate::cpu::{self, myproc};
use crate::param::TIMEKEEPER_CPU;
use crate::proc::{self, ProcState, PTABLE};
use crate::scheduler::{self, Charge, ClockEvent, TICKS};
use crate::syscalls::syscall_dispatch;

/// Timer interrupt: tick accounting on the timekeeping CPU, then preempt.
pub fn timer_interrupt(from_user: bool) {
    if cpu::id() == TIMEKEEPER_CPU {
        account_tick();
    }

    exit_if_killed(from_user);
    if proc::with_current(|p| p.state == ProcState::Running).unwrap_or(false) {
        scheduler::yield_now();
    }
    exit_if_killed(from_user);
}

fn account_tick() {
    let event = TICKS.advance();
    scheduler::wakeup(TICKS.channel());

    let mut table = PTABLE.lock();
    match event {
        ClockEvent::Boost => {
            table.boost();
            kdebug!("priority boost");
        }
        ClockEvent::Tick => {
            let Some(handle) = myproc() else {
                return;
            };
            match table.charge_tick(handle) {
                Some(Charge::Demoted { from, to }) => {
                    ktrace!("pid {}: level {} -> {}", table[handle].pid, from, to);
                }
                Some(Charge::Decayed { priority }) => {
                    ktrace!("pid {}: priority now {}", table[handle].pid, priority);
                }
                _ => {}
            }
        }
    }
}

fn exit_if_killed(from_user: bool) {
    if from_user && proc::killed() {
        proc::exit();
    }
}

/// System call trap. Reads the call number and arguments from the current
/// trap frame and stores the result back into it.
pub fn syscall_trap() {
    exit_if_killed(true);

    let Some((nr, arg1, arg2)) = proc::with_current(|p| (p.tf.rax, p.tf.rdi, p.tf.rsi)) else {
        kpanic!("syscall: no current process");
    };
    let ret = syscall_dispatch(nr, arg1, arg2);
    proc::with_current(|p| p.tf.rax = ret as u64);

    exit_if_killed(true);
}
