//! Scheduler loop and the suspend/resume protocol
//!
//! Each CPU runs [`scheduler`] forever. A process gives the CPU back only by
//! calling [`sched`] with the table lock held and its state already changed;
//! the scheduler loop resumes with that same lock held and releases it. A
//! brand-new process has no `sched` frame to return into, so its first switch
//! lands in [`forkret`], which releases the lock instead.

use core::sync::atomic::{AtomicBool, Ordering};

use super::policy::{self, Selection};
use crate::arch::{machine, Context};
use crate::cpu::{self, mycpu, myproc, pop_off, push_off, Cpu};
use crate::fs::filesystem;
use crate::mm::memory;
use crate::proc::{ProcState, ProcTable, PTABLE};
use crate::sync::SpinLockGuard;

/// Per-CPU dispatch loop. Never returns.
pub fn scheduler() -> ! {
    push_off();
    mycpu().set_current(None);
    kinfo!("cpu{}: scheduler starting", cpu::id());
    pop_off();

    let machine = machine();
    loop {
        machine.enable_interrupts();

        let mut table = PTABLE.lock();
        let cpu = mycpu();
        match policy::select(&table, cpu.cursor()) {
            Some(selection) => run(&mut table, cpu, selection),
            None => {
                drop(table);
                machine.idle();
            }
        }
    }
}

fn run(table: &mut SpinLockGuard<'_, ProcTable>, cpu: &'static Cpu, selection: Selection) {
    let handle = selection.handle;
    let (space, kstack, pid) = {
        let p = &table[handle];
        (p.space, p.kstack, p.pid)
    };
    let (Some(space), Some(kstack)) = (space, kstack) else {
        kpanic!("scheduler: pid {} has no address space", pid);
    };

    cpu.set_current(Some(handle));
    memory().activate(space, kstack);
    table.dispatch(handle);
    debug_assert!(table.ready_counts_consistent(), "ready counts out of sync");
    cpu.set_cursor(handle.index() + 1);
    ktrace!("cpu{}: run pid {} via {:?}", cpu::id(), pid, selection.tier);

    let context = &table[handle].context as *const Context;
    // SAFETY: the slot outlives the switch; the process only leaves it via sched.
    unsafe { machine().switch(cpu.scheduler_context(), context) };

    // Back with the table lock held; the process changed its own state.
    memory().activate_kernel();
    cpu.set_current(None);
}

/// Switches from the current process into this CPU's scheduler.
///
/// The caller holds only the table lock and has already moved the process
/// out of Running. Returns, still holding the lock, once the process is
/// dispatched again, possibly on another CPU.
pub fn sched(table: &mut SpinLockGuard<'_, ProcTable>) {
    let Some(handle) = myproc() else {
        kpanic!("sched: no current process");
    };
    if !core::ptr::eq(SpinLockGuard::lock_ref(table), &*PTABLE) || !PTABLE.holding() {
        kpanic!("sched: ptable lock not held");
    }
    let cpu = mycpu();
    if cpu.noff() != 1 {
        kpanic!("sched: other locks held");
    }
    if table[handle].state == ProcState::Running {
        kpanic!("sched: process still running");
    }
    if machine().interrupts_enabled() {
        kpanic!("sched: interruptible");
    }

    let intena = cpu.intena();
    let context = &mut table[handle].context as *mut Context;
    // SAFETY: lock held, interrupts off; the scheduler context belongs to this CPU.
    unsafe { machine().switch(context, cpu.scheduler_context()) };
    mycpu().set_intena(intena);
}

/// Gives up the CPU for one scheduling round.
pub fn yield_now() {
    let Some(handle) = myproc() else {
        kpanic!("yield: no current process");
    };
    let mut table = PTABLE.lock();
    table.make_runnable(handle);
    sched(&mut table);
}

/// First code a new process runs, still holding the table lock the
/// scheduler took to dispatch it.
pub(crate) extern "C" fn forkret() -> ! {
    static FIRST: AtomicBool = AtomicBool::new(true);

    // SAFETY: the dispatching scheduler acquired the lock on this CPU and
    // resumes only after some process switches back to it.
    unsafe { PTABLE.force_release() };

    if FIRST.swap(false, Ordering::AcqRel) {
        filesystem().init_from_first_process();
    }

    machine().return_to_user()
}
