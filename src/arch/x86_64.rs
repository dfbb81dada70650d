//! Bare-metal x86_64 machine
//!
//! Interrupt control comes from the `x86_64` crate. The switch routine only
//! saves what the System V ABI marks callee-saved; everything else is already
//! spilled by the Rust caller.

use x86_64::instructions::interrupts;

use super::{Context, Machine};

core::arch::global_asm!(
    ".global mlfq_swtch",
    "mlfq_swtch:",
    "mov [rdi + 0x00], r15",
    "mov [rdi + 0x08], r14",
    "mov [rdi + 0x10], r13",
    "mov [rdi + 0x18], r12",
    "mov [rdi + 0x20], rbx",
    "mov [rdi + 0x28], rbp",
    "lea rax, [rsp + 8]",
    "mov [rdi + 0x30], rax",
    "mov rax, [rsp]",
    "mov [rdi + 0x38], rax",
    "mov r15, [rsi + 0x00]",
    "mov r14, [rsi + 0x08]",
    "mov r13, [rsi + 0x10]",
    "mov r12, [rsi + 0x18]",
    "mov rbx, [rsi + 0x20]",
    "mov rbp, [rsi + 0x28]",
    "mov rsp, [rsi + 0x30]",
    "jmp qword ptr [rsi + 0x38]",
);

extern "C" {
    fn mlfq_swtch(old: *mut Context, new: *const Context);
}

/// `Machine` for bare-metal x86_64.
///
/// The boot image that links this crate builds one and passes it to
/// [`crate::kernel_main`] inside its `Platform`. The local APIC id lookup and
/// the trap-return path depend on that image's boot code, so it supplies them.
pub struct X86Machine {
    cpu_id: fn() -> usize,
    user_return: fn() -> !,
}

impl X86Machine {
    pub const fn new(cpu_id: fn() -> usize, user_return: fn() -> !) -> Self {
        Self {
            cpu_id,
            user_return,
        }
    }
}

impl Machine for X86Machine {
    fn cpu_id(&self) -> usize {
        (self.cpu_id)()
    }

    fn interrupts_enabled(&self) -> bool {
        interrupts::are_enabled()
    }

    fn enable_interrupts(&self) {
        interrupts::enable();
    }

    fn disable_interrupts(&self) {
        interrupts::disable();
    }

    unsafe fn switch(&self, old: *mut Context, new: *const Context) {
        mlfq_swtch(old, new);
    }

    fn return_to_user(&self) -> ! {
        (self.user_return)()
    }
}

pub fn halt_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}
