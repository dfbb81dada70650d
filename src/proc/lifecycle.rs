//! Process lifecycle: creation, exit, reaping and kill
//!
//! Collaborator calls (page allocation, address-space copies, file
//! references) are made without the table lock held; the table is locked
//! only around the state transitions themselves.

use super::table::{Reap, Released, PTABLE};
use super::types::{Pid, Proc, ProcHandle};
use super::ProcError;
use crate::arch::{Context, TrapFrame, RFLAGS_IF, USER_CS, USER_DS};
use crate::cpu::myproc;
use crate::fs::filesystem;
use crate::mm::{memory, KernelStack};
use crate::param::{NOFILE, PGSIZE};
use crate::scheduler::{forkret, sched, sleep_locked};

/// Claims a slot and gives it a kernel stack whose first switch lands in `forkret`.
fn allocproc() -> Option<ProcHandle> {
    let Some(handle) = PTABLE.lock().alloc() else {
        kdebug!("allocproc: process table full");
        return None;
    };

    let Some(page) = memory().alloc_page() else {
        kdebug!("allocproc: no page for a kernel stack");
        PTABLE.lock().release(handle);
        return None;
    };

    let kstack = KernelStack::new(page);
    let mut table = PTABLE.lock();
    let p = &mut table[handle];
    p.kstack = Some(kstack);
    p.context = Context::entering(forkret as *const () as usize, kstack.top());
    Some(handle)
}

fn free_resources(released: Released) {
    let memory = memory();
    if let Some(kstack) = released.kstack {
        memory.free_page(kstack.page());
    }
    if let Some(space) = released.space {
        memory.destroy_address_space(space);
    }
}

/// Creates the first user process from `image` and makes it Runnable.
pub fn userinit(image: &[u8]) -> ProcHandle {
    if image.len() > PGSIZE {
        kpanic!("userinit: init image larger than a page");
    }
    let Some(handle) = allocproc() else {
        kpanic!("userinit: cannot allocate the first process");
    };
    let Some(space) = memory().create_address_space(image) else {
        kpanic!("userinit: out of memory?");
    };
    let cwd = filesystem().resolve("/");

    let mut table = PTABLE.lock();
    let p = &mut table[handle];
    p.space = Some(space);
    p.size = PGSIZE;
    p.tf = TrapFrame {
        cs: USER_CS,
        ss: USER_DS,
        rflags: RFLAGS_IF,
        rsp: PGSIZE as u64,
        rip: 0,
        ..TrapFrame::default()
    };
    p.set_name("initcode");
    p.cwd = cwd;
    let pid = p.pid;
    table.set_init_process(handle);
    table.make_runnable(handle);
    kinfo!("userinit: first process is pid {}", pid);
    handle
}

/// Duplicates the calling process. The parent gets the child's pid; the
/// child resumes from the same trap frame with a zero return value.
pub fn fork() -> Result<Pid, ProcError> {
    let parent = myproc().ok_or(ProcError::NoProcess)?;
    let child = allocproc().ok_or(ProcError::CreateFailed)?;

    let (space, size, tf, name, ofile, cwd) = {
        let table = PTABLE.lock();
        let p = &table[parent];
        (p.space, p.size, p.tf, p.name, p.ofile, p.cwd)
    };

    let Some(space) = space.and_then(|space| memory().duplicate_address_space(space, size)) else {
        kdebug!("fork: cannot copy the address space");
        let released = PTABLE.lock().release(child);
        free_resources(released);
        return Err(ProcError::CreateFailed);
    };

    let fs = filesystem();
    let ofile = ofile.map(|file| file.map(|file| fs.dup_file(file)));
    let cwd = cwd.map(|inode| fs.dup_inode(inode));

    let mut table = PTABLE.lock();
    let c = &mut table[child];
    c.space = Some(space);
    c.size = size;
    c.parent = Some(parent);
    c.tf = tf;
    c.tf.rax = 0;
    c.name = name;
    c.ofile = ofile;
    c.cwd = cwd;
    let pid = c.pid;
    table.make_runnable(child);
    kdebug!("fork: pid {} -> child pid {}", table[parent].pid, pid);
    Ok(pid)
}

/// Terminates the calling process. It stays a Zombie until its parent reaps it.
pub fn exit() -> ! {
    let Some(cur) = myproc() else {
        kpanic!("exit: no current process");
    };

    let (files, cwd) = {
        let mut table = PTABLE.lock();
        if table.init_process() == Some(cur) {
            kpanic!("init exiting");
        }
        let p = &mut table[cur];
        (core::mem::replace(&mut p.ofile, [None; NOFILE]), p.cwd.take())
    };

    let fs = filesystem();
    for file in files.into_iter().flatten() {
        fs.close_file(file);
    }
    if let Some(cwd) = cwd {
        fs.begin_op();
        fs.put_inode(cwd);
        fs.end_op();
    }

    let mut table = PTABLE.lock();
    kdebug!("exit: pid {}", table[cur].pid);
    table.retire(cur);
    sched(&mut table);
    kpanic!("zombie exit");
}

/// Waits for a child to exit and returns its pid.
pub fn wait() -> Result<Pid, ProcError> {
    let cur = myproc().ok_or(ProcError::NoProcess)?;
    let mut table = PTABLE.lock();
    loop {
        match table.reap_child(cur) {
            Reap::Reaped(released) => {
                drop(table);
                let pid = released.pid;
                free_resources(released);
                return Ok(pid);
            }
            Reap::NoChildren => return Err(ProcError::NoChildren),
            Reap::Pending if table[cur].killed => return Err(ProcError::NoChildren),
            Reap::Pending => {
                let chan = table.wait_channel(cur);
                table = sleep_locked(chan, table);
            }
        }
    }
}

/// Asks `pid` to terminate at its next return to user space.
pub fn kill(pid: Pid) -> Result<(), ProcError> {
    PTABLE.lock().kill(pid)
}

/// Grows (or shrinks, for negative `delta`) the caller's memory and returns the old size.
pub fn grow(delta: isize) -> Result<usize, ProcError> {
    let cur = myproc().ok_or(ProcError::NoProcess)?;
    let (space, kstack, size) = {
        let table = PTABLE.lock();
        let p = &table[cur];
        (p.space, p.kstack, p.size)
    };
    let (Some(space), Some(kstack)) = (space, kstack) else {
        return Err(ProcError::OutOfMemory);
    };

    let target = size.checked_add_signed(delta).ok_or(ProcError::OutOfMemory)?;
    let new_size = if target == size {
        size
    } else {
        memory()
            .resize(space, size, target)
            .ok_or(ProcError::OutOfMemory)?
    };

    PTABLE.lock()[cur].size = new_size;
    memory().activate(space, kstack);
    Ok(size)
}

pub fn current_pid() -> Option<Pid> {
    let handle = myproc()?;
    PTABLE.lock().get(handle).map(|p| p.pid)
}

/// Runs `f` on the current process's slot with the table locked.
pub fn with_current<R>(f: impl FnOnce(&mut Proc) -> R) -> Option<R> {
    let handle = myproc()?;
    PTABLE.lock().get_mut(handle).map(f)
}

/// Has the current process been killed?
pub fn killed() -> bool {
    with_current(|p| p.killed).unwrap_or(false)
}
