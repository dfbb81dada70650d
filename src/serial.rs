//! COM1 output for bare-metal log lines

use core::fmt;
use spin::Mutex;
use uart_16550::SerialPort;

const COM1: u16 = 0x3F8;

struct Console {
    port: Option<SerialPort>,
}

impl Console {
    const fn new() -> Self {
        Self { port: None }
    }

    fn port(&mut self) -> &mut SerialPort {
        self.port.get_or_insert_with(|| {
            let mut port = unsafe { SerialPort::new(COM1) };
            port.init();
            port
        })
    }
}

static CONSOLE: Mutex<Console> = Mutex::new(Console::new());

pub fn init() {
    CONSOLE.lock().port();
}

pub(crate) fn _print(args: fmt::Arguments<'_>) {
    use core::fmt::Write;
    CONSOLE.lock().port().write_fmt(args).ok();
}
