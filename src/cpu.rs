//! Per-CPU state
//!
//! Each CPU owns one [`Cpu`] record. It is only touched by code running on
//! that CPU with interrupts disabled, which is what makes the unsynchronized
//! interior mutability sound.

use core::cell::UnsafeCell;

use crate::arch::{machine, Context};
use crate::param::NCPU;
use crate::proc::ProcHandle;

struct CpuState {
    /// Process running on this CPU, if any
    proc: Option<ProcHandle>,
    /// Saved context of this CPU's scheduler loop
    scheduler: Context,
    /// Depth of `push_off` nesting
    noff: u32,
    /// Were interrupts enabled before the outermost `push_off`?
    intena: bool,
    /// Slot index the next round-robin scan starts from
    cursor: usize,
}

pub struct Cpu {
    state: UnsafeCell<CpuState>,
}

unsafe impl Sync for Cpu {}

impl Cpu {
    const fn new() -> Self {
        Self {
            state: UnsafeCell::new(CpuState {
                proc: None,
                scheduler: Context::zero(),
                noff: 0,
                intena: false,
                cursor: 0,
            }),
        }
    }

    #[allow(clippy::mut_from_ref)]
    fn state(&self) -> &mut CpuState {
        // SAFETY: only the owning CPU reaches its record, with interrupts off.
        unsafe { &mut *self.state.get() }
    }

    pub fn current(&self) -> Option<ProcHandle> {
        self.state().proc
    }

    pub(crate) fn set_current(&self, proc: Option<ProcHandle>) {
        self.state().proc = proc;
    }

    pub fn noff(&self) -> u32 {
        self.state().noff
    }

    pub fn intena(&self) -> bool {
        self.state().intena
    }

    pub(crate) fn set_intena(&self, intena: bool) {
        self.state().intena = intena;
    }

    pub(crate) fn scheduler_context(&self) -> *mut Context {
        &mut self.state().scheduler
    }

    pub(crate) fn cursor(&self) -> usize {
        self.state().cursor
    }

    pub(crate) fn set_cursor(&self, cursor: usize) {
        self.state().cursor = cursor;
    }
}

#[allow(clippy::declare_interior_mutable_const)]
const CPU_INIT: Cpu = Cpu::new();

static CPUS: [Cpu; NCPU] = [CPU_INIT; NCPU];

/// Index of the executing CPU.
///
/// Only stable while interrupts are off; the caller may otherwise be moved.
pub fn id() -> usize {
    machine().cpu_id()
}

/// The executing CPU's record. Interrupts must be disabled.
pub fn mycpu() -> &'static Cpu {
    let machine = machine();
    if machine.interrupts_enabled() {
        kpanic!("mycpu called with interrupts enabled");
    }
    let id = machine.cpu_id();
    match CPUS.get(id) {
        Some(cpu) => cpu,
        None => kpanic!("mycpu: unknown cpu {}", id),
    }
}

/// Disables interrupts, counting nesting so `pop_off` restores the outermost state.
pub fn push_off() {
    let machine = machine();
    let old = machine.interrupts_enabled();
    machine.disable_interrupts();
    let cpu = mycpu();
    let state = cpu.state();
    if state.noff == 0 {
        state.intena = old;
    }
    state.noff += 1;
}

pub fn pop_off() {
    let machine = machine();
    if machine.interrupts_enabled() {
        kpanic!("pop_off: interruptible");
    }
    let state = mycpu().state();
    if state.noff == 0 {
        kpanic!("pop_off: unbalanced");
    }
    state.noff -= 1;
    if state.noff == 0 && state.intena {
        machine.enable_interrupts();
    }
}

/// Handle of the process running on this CPU.
pub fn myproc() -> Option<ProcHandle> {
    push_off();
    let proc = mycpu().current();
    pop_off();
    proc
}
