use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use spin::Once;

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);
static BOOT_TSC: AtomicU64 = AtomicU64::new(0);
static TSC_FREQUENCY_HZ: AtomicU64 = AtomicU64::new(DEFAULT_TSC_FREQUENCY_HZ);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(default_level().priority());
static SINK: Once<LogSink> = Once::new();

const DEFAULT_TSC_FREQUENCY_HZ: u64 = 1_000_000_000; // 1 GHz fallback

/// Receives every emitted line instead of the serial port.
///
/// Hosted builds install one; bare metal falls back to COM1.
pub type LogSink = fn(LogLevel, u64, fmt::Arguments<'_>);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    PANIC,
    FATAL,
    ERROR,
    WARN,
    INFO,
    DEBUG,
    TRACE,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::PANIC => "PANIC",
            LogLevel::FATAL => "FATAL",
            LogLevel::ERROR => "ERROR",
            LogLevel::WARN => "WARN",
            LogLevel::INFO => "INFO",
            LogLevel::DEBUG => "DEBUG",
            LogLevel::TRACE => "TRACE",
        }
    }

    #[cfg(all(target_arch = "x86_64", target_os = "none"))]
    fn serial_color(self) -> &'static str {
        match self {
            LogLevel::PANIC | LogLevel::FATAL => "\x1b[1;37;41m",
            LogLevel::ERROR => "\x1b[1;31m",
            LogLevel::WARN => "\x1b[33m",
            LogLevel::INFO => "\x1b[32m",
            LogLevel::DEBUG => "\x1b[36m",
            LogLevel::TRACE => "\x1b[90m",
        }
    }

    const fn priority(self) -> u8 {
        self as u8
    }

    fn from_priority(value: u8) -> Self {
        match value {
            0 => LogLevel::PANIC,
            1 => LogLevel::FATAL,
            2 => LogLevel::ERROR,
            3 => LogLevel::WARN,
            4 => LogLevel::INFO,
            5 => LogLevel::DEBUG,
            _ => LogLevel::TRACE,
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        const NAMES: [(&str, LogLevel); 8] = [
            ("panic", LogLevel::PANIC),
            ("fatal", LogLevel::FATAL),
            ("error", LogLevel::ERROR),
            ("warn", LogLevel::WARN),
            ("warning", LogLevel::WARN),
            ("info", LogLevel::INFO),
            ("debug", LogLevel::DEBUG),
            ("trace", LogLevel::TRACE),
        ];
        NAMES
            .iter()
            .find(|(name, _)| value.eq_ignore_ascii_case(name))
            .map(|&(_, level)| level)
    }
}

const fn default_level() -> LogLevel {
    if cfg!(feature = "debug_verbose") {
        LogLevel::DEBUG
    } else {
        LogLevel::INFO
    }
}

/// Records the boot timestamp. Safe to call more than once.
pub fn init() {
    if LOGGER_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }
    BOOT_TSC.store(read_tsc(), Ordering::Relaxed);
}

pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.load(Ordering::Relaxed)
}

/// Routes all output to `sink`. Only the first installation wins.
pub fn install_sink(sink: LogSink) {
    SINK.call_once(|| sink);
}

pub fn log(level: LogLevel, args: fmt::Arguments<'_>) {
    if level.priority() > LOG_LEVEL.load(Ordering::Relaxed) {
        return;
    }

    let timestamp_us = boot_time_us();
    if let Some(sink) = SINK.get() {
        sink(level, timestamp_us, args);
        return;
    }

    #[cfg(all(target_arch = "x86_64", target_os = "none"))]
    emit_serial_line(level, timestamp_us, args);
}

pub fn set_max_level(level: LogLevel) {
    LOG_LEVEL.store(level.priority(), Ordering::Relaxed);
}

pub fn max_level() -> LogLevel {
    LogLevel::from_priority(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn parse_level_directive(cmdline: &str) -> Option<LogLevel> {
    cmdline
        .split_whitespace()
        .filter_map(|token| token.split_once('='))
        .filter(|(key, _)| key.eq_ignore_ascii_case("log") || key.eq_ignore_ascii_case("loglevel"))
        .find_map(|(_, value)| LogLevel::from_str(value))
}

/// Replaces the fallback rate once the platform has calibrated the TSC.
/// A zero rate is ignored.
pub fn set_tsc_frequency_hz(hz: u64) {
    if hz != 0 {
        TSC_FREQUENCY_HZ.store(hz, Ordering::Relaxed);
    }
}

pub fn tsc_frequency_hz() -> u64 {
    TSC_FREQUENCY_HZ.load(Ordering::Relaxed)
}

pub fn boot_time_us() -> u64 {
    let start = BOOT_TSC.load(Ordering::Relaxed);
    let freq = TSC_FREQUENCY_HZ.load(Ordering::Relaxed);
    if start == 0 || freq == 0 {
        return 0;
    }

    let ticks = read_tsc().saturating_sub(start);
    ticks.saturating_mul(1_000_000) / freq
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
fn emit_serial_line(level: LogLevel, timestamp_us: u64, args: fmt::Arguments<'_>) {
    crate::serial::_print(format_args!(
        "{color}[{timestamp}] [{level:<5}] {message}\x1b[0m\n",
        color = level.serial_color(),
        timestamp = TimestampDisplay {
            microseconds: timestamp_us
        },
        level = level.as_str(),
        message = args,
    ));
}

fn read_tsc() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::x86_64::_rdtsc()
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        0
    }
}

/// `seconds.micros` formatting used in every log prefix
pub struct TimestampDisplay {
    pub microseconds: u64,
}

impl fmt::Display for TimestampDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.microseconds / 1_000_000;
        let micros = self.microseconds % 1_000_000;
        write!(f, "{:>5}.{:06}", seconds, micros)
    }
}
