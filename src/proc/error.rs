use core::fmt;

/// Recoverable failures of process-control operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcError {
    /// No free slot, no kernel stack, or the address space could not be copied
    CreateFailed,
    /// No process with the requested pid
    NotFound,
    /// `wait` with nothing to wait for, or interrupted by a kill
    NoChildren,
    /// Called from a context with no current process
    NoProcess,
    PriorityOutOfRange,
    /// A process asked for exclusive mode on itself
    SelfTarget,
    AlreadyExclusive,
    BadSecret,
    /// User memory could not be resized
    OutOfMemory,
    /// The caller was killed while blocked
    Killed,
}

impl ProcError {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProcError::CreateFailed => "cannot create process",
            ProcError::NotFound => "no such process",
            ProcError::NoChildren => "no children",
            ProcError::NoProcess => "no current process",
            ProcError::PriorityOutOfRange => "priority out of range",
            ProcError::SelfTarget => "cannot target self",
            ProcError::AlreadyExclusive => "already exclusive",
            ProcError::BadSecret => "bad password",
            ProcError::OutOfMemory => "out of memory",
            ProcError::Killed => "killed",
        }
    }

    /// Return value seen by user programs
    pub const fn code(self) -> i32 {
        match self {
            ProcError::PriorityOutOfRange | ProcError::BadSecret => -2,
            ProcError::AlreadyExclusive => -3,
            ProcError::SelfTarget => -4,
            _ => -1,
        }
    }
}

impl fmt::Display for ProcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
