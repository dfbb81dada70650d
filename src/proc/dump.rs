//! Process listing for the console debug key
//!
//! Reads the table without locking so it still works when the machine is
//! wedged holding the table lock. Output may be inconsistent.

use core::fmt::{self, Write};

use super::table::PTABLE;
use super::types::{Proc, ProcState};

const BACKTRACE_DEPTH: usize = 10;

/// Writes one line per live process: pid, state, name and, for sleepers,
/// the return addresses found by walking the saved frame pointers.
pub fn procdump(out: &mut dyn Write) -> fmt::Result {
    // SAFETY: best effort; torn reads only garble the listing.
    let table = unsafe { PTABLE.get_unsynchronized() };
    for (_, p) in table.iter() {
        write!(out, "{} {} {}", p.pid, p.state.as_str(), p.name())?;
        if p.state == ProcState::Sleeping {
            let mut pcs = [0u64; BACKTRACE_DEPTH];
            let depth = backtrace(p, &mut pcs);
            for pc in &pcs[..depth] {
                write!(out, " {:#x}", pc)?;
            }
        }
        out.write_char('\n')?;
    }
    Ok(())
}

/// Walks at most `pcs.len()` frames, never leaving the process's kernel stack.
fn backtrace(p: &Proc, pcs: &mut [u64]) -> usize {
    let Some(kstack) = p.kstack else {
        return 0;
    };

    let mut fp = p.context.rbp as usize;
    let mut depth = 0;
    while depth < pcs.len() && fp % 8 == 0 && kstack.contains(fp) && kstack.contains(fp + 8) {
        let frame = fp as *const u64;
        // SAFETY: both words lie inside the process's own kernel stack page.
        let (next, ret) = unsafe { (frame.read_volatile(), frame.add(1).read_volatile()) };
        pcs[depth] = ret;
        depth += 1;
        fp = next as usize;
    }
    depth
}

/// Sends the listing to the kernel log one line at a time.
pub fn procdump_to_log() {
    let mut writer = LogLines::new();
    let _ = procdump(&mut writer);
    writer.flush();
}

struct LogLines {
    buf: [u8; 128],
    len: usize,
}

impl LogLines {
    const fn new() -> Self {
        Self {
            buf: [0; 128],
            len: 0,
        }
    }

    fn flush(&mut self) {
        if self.len > 0 {
            let line = core::str::from_utf8(&self.buf[..self.len]).unwrap_or("<garbled>");
            kinfo!("{}", line);
            self.len = 0;
        }
    }
}

impl Write for LogLines {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            if byte == b'\n' {
                self.flush();
                continue;
            }
            if self.len == self.buf.len() {
                self.flush();
            }
            self.buf[self.len] = byte;
            self.len += 1;
        }
        Ok(())
    }
}
