//! Machine interface
//!
//! Everything the scheduler needs from the processor goes through the
//! [`Machine`] trait: which CPU is executing, the interrupt-enable flag, the
//! register-level context switch and the final return to user mode. The
//! bare-metal implementation lives in `x86_64`; hosted builds install their
//! own.

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod x86_64;

use spin::Once;

/// Callee-saved kernel register state of a suspended execution context.
///
/// The field order is fixed by the switch routine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Context {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub rbx: u64,
    pub rbp: u64,
    pub rsp: u64,
    pub rip: u64,
}

impl Context {
    pub const fn zero() -> Self {
        Self {
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            rbx: 0,
            rbp: 0,
            rsp: 0,
            rip: 0,
        }
    }

    /// A context that starts executing `entry` on a fresh stack ending at `stack_top`.
    pub const fn entering(entry: usize, stack_top: usize) -> Self {
        let mut context = Self::zero();
        context.rip = entry as u64;
        // Function entry expects a pushed return address.
        context.rsp = (stack_top & !0xf) as u64 - 8;
        context
    }
}

/// User register state saved on kernel entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TrapFrame {
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub rbp: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub trapno: u64,
    pub err: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

pub const USER_CS: u64 = 0x1b;
pub const USER_DS: u64 = 0x23;
pub const RFLAGS_IF: u64 = 1 << 9;

pub trait Machine: Sync {
    /// Index of the executing CPU, below `param::NCPU`.
    fn cpu_id(&self) -> usize;

    fn interrupts_enabled(&self) -> bool;

    fn enable_interrupts(&self);

    fn disable_interrupts(&self);

    /// Saves the running kernel context into `old` and resumes `new`.
    ///
    /// Returns when some other CPU or context switches back into `old`.
    ///
    /// # Safety
    /// Both pointers must be valid for the duration of the switch and `new`
    /// must hold a context produced by a previous switch or by
    /// [`Context::entering`].
    unsafe fn switch(&self, old: *mut Context, new: *const Context);

    /// Leaves the kernel for user mode on behalf of the current process.
    fn return_to_user(&self) -> !;

    /// Called by an idle scheduler loop between scans.
    fn idle(&self) {
        core::hint::spin_loop();
    }
}

static MACHINE: Once<&'static dyn Machine> = Once::new();

pub fn install(machine: &'static dyn Machine) {
    MACHINE.call_once(|| machine);
}

pub fn machine() -> &'static dyn Machine {
    match MACHINE.get() {
        Some(machine) => *machine,
        None => kpanic!("machine interface used before install"),
    }
}

/// Parks the executing CPU for good.
pub fn halt_loop() -> ! {
    #[cfg(all(target_arch = "x86_64", target_os = "none"))]
    x86_64::halt_loop();

    #[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
    loop {
        core::hint::spin_loop();
    }
}
