//! MLFQ kernel core
//!
//! Process table, per-CPU scheduler loops, sleep/wakeup and timer accounting
//! for an xv6-style kernel. Hardware, memory management and the filesystem
//! are reached through collaborator traits installed at boot:
//! [`arch::Machine`], [`mm::Memory`] and [`fs::FileSystem`].

#![no_std]

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        $crate::logger::log($level, format_args!($($arg)*));
    }};
}

/// Logs the failure with its location and panics.
#[macro_export]
macro_rules! kpanic {
    ($($arg:tt)*) => {{
        let loc = core::panic::Location::caller();
        $crate::klog!(
            $crate::logger::LogLevel::PANIC,
            "Kernel panic - not syncing: {} at {}:{}",
            format_args!($($arg)*),
            loc.file(),
            loc.line(),
        );
        panic!($($arg)*)
    }};
}

#[macro_export]
macro_rules! kfatal {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::FATAL, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::ERROR, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::WARN, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::INFO, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::DEBUG, $($arg)*);
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::TRACE, $($arg)*);
    }};
}

pub mod arch;
pub mod cpu;
pub mod fs;
pub mod logger;
pub mod mm;
pub mod param;
pub mod proc;
pub mod scheduler;
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod serial;
pub mod sync;
pub mod syscalls;
pub mod trap;

use arch::Machine;
use fs::FileSystem;
use mm::Memory;

/// The collaborators a kernel instance runs on
#[derive(Clone, Copy)]
pub struct Platform {
    pub machine: &'static dyn Machine,
    pub memory: &'static dyn Memory,
    pub fs: &'static dyn FileSystem,
}

/// Installs the collaborators. The first installation wins.
pub fn install(platform: Platform) {
    arch::install(platform.machine);
    mm::install(platform.memory);
    fs::install(platform.fs);
}

/// Boot CPU entry: honours `log=` on the command line, creates the first
/// process from `init_image` and starts scheduling.
pub fn kernel_main(platform: Platform, cmdline: &str, init_image: &[u8]) -> ! {
    logger::init();
    if let Some(level) = logger::parse_level_directive(cmdline) {
        logger::set_max_level(level);
    }
    #[cfg(all(target_arch = "x86_64", target_os = "none"))]
    serial::init();

    install(platform);
    kinfo!("mlfq kernel: {} slots, {} cpus", param::NPROC, param::NCPU);

    proc::userinit(init_image);
    scheduler::scheduler()
}

/// Entry for every other CPU once the boot CPU has installed the platform.
pub fn kernel_secondary() -> ! {
    scheduler::scheduler()
}

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    kfatal!("{}", info);
    arch::halt_loop()
}
