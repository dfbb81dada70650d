//! Process type definitions

use core::fmt;

use crate::arch::{Context, TrapFrame};
use crate::fs::{FileRef, InodeRef};
use crate::mm::{AddressSpace, KernelStack};
use crate::param::{DEFAULT_PRIORITY, NOFILE, PROC_NAME_LEN};

pub type Pid = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcState {
    Unused,
    Embryo,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

impl ProcState {
    /// Fixed-width label used by the process dump
    pub const fn as_str(self) -> &'static str {
        match self {
            ProcState::Unused => "unused",
            ProcState::Embryo => "embryo",
            ProcState::Sleeping => "sleep ",
            ProcState::Runnable => "runble",
            ProcState::Running => "run   ",
            ProcState::Zombie => "zombie",
        }
    }
}

/// Stable reference to a process table slot.
///
/// The generation changes every time the slot is freed, so a handle kept
/// past the process's reaping no longer resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcHandle {
    index: usize,
    generation: u32,
}

impl ProcHandle {
    pub(crate) const fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn index(self) -> usize {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Opaque key a sleeping process waits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Channel(usize);

impl Channel {
    pub const fn new(key: usize) -> Self {
        Self(key)
    }

    /// The channel named by the address of `object`.
    pub fn of<T>(object: &T) -> Self {
        Self(object as *const T as usize)
    }

    pub const fn key(self) -> usize {
        self.0
    }
}

/// Process control block
pub struct Proc {
    pub(crate) generation: u32,
    pub pid: Pid,
    pub state: ProcState,
    /// MLFQ level, 0 through `LOWEST_LEVEL`
    pub level: u8,
    /// Ticks used of the current level's slice
    pub tick: u32,
    /// Only consulted at the lowest level
    pub priority: u8,
    pub monopolize: bool,
    pub chan: Option<Channel>,
    pub killed: bool,
    pub parent: Option<ProcHandle>,
    pub name: [u8; PROC_NAME_LEN],
    /// Bytes of user memory
    pub size: usize,
    pub kstack: Option<KernelStack>,
    pub space: Option<AddressSpace>,
    pub tf: TrapFrame,
    pub context: Context,
    pub ofile: [Option<FileRef>; NOFILE],
    pub cwd: Option<InodeRef>,
}

impl Proc {
    pub(crate) fn unused() -> Self {
        Self {
            generation: 0,
            pid: 0,
            state: ProcState::Unused,
            level: 0,
            tick: 0,
            priority: DEFAULT_PRIORITY,
            monopolize: false,
            chan: None,
            killed: false,
            parent: None,
            name: [0; PROC_NAME_LEN],
            size: 0,
            kstack: None,
            space: None,
            tf: TrapFrame::default(),
            context: Context::zero(),
            ofile: [None; NOFILE],
            cwd: None,
        }
    }

    /// Reset every field except the generation.
    pub(crate) fn clear(&mut self) {
        let generation = self.generation;
        *self = Self::unused();
        self.generation = generation;
    }

    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..len]).unwrap_or("?")
    }

    /// Stores `name`, truncated to fit with a terminating NUL.
    pub fn set_name(&mut self, name: &str) {
        self.name = [0; PROC_NAME_LEN];
        let len = name.len().min(PROC_NAME_LEN - 1);
        self.name[..len].copy_from_slice(&name.as_bytes()[..len]);
    }

    /// Counts toward its level's ready counter when Runnable.
    pub fn is_queued(&self) -> bool {
        self.state == ProcState::Runnable && !self.monopolize
    }
}

impl fmt::Debug for Proc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proc")
            .field("pid", &self.pid)
            .field("state", &self.state)
            .field("level", &self.level)
            .field("tick", &self.tick)
            .field("priority", &self.priority)
            .field("monopolize", &self.monopolize)
            .field("killed", &self.killed)
            .field("name", &self.name())
            .finish()
    }
}

/// Level reported to a process asking where it is queued
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueLevel {
    Level(u8),
    Exclusive,
}
