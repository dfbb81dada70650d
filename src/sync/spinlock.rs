//! Interrupt-aware spinlock
//!
//! Acquiring disables interrupts on the local CPU for as long as the lock is
//! held, and the lock remembers its holder so `holding` can answer for the
//! current CPU. Re-acquiring a lock already held by this CPU is fatal.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::cpu::{self, pop_off, push_off};

const NO_CPU: usize = usize::MAX;

pub struct SpinLock<T> {
    name: &'static str,
    locked: AtomicBool,
    cpu: AtomicUsize,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for SpinLock<T> {}
unsafe impl<T: Send> Send for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(name: &'static str, data: T) -> Self {
        Self {
            name,
            locked: AtomicBool::new(false),
            cpu: AtomicUsize::new(NO_CPU),
            data: UnsafeCell::new(data),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.acquire();
        SpinLockGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    fn acquire(&self) {
        push_off();
        if self.holding() {
            kpanic!("acquire: {} already held by this cpu", self.name);
        }
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
        self.cpu.store(cpu::id(), Ordering::Relaxed);
    }

    fn release(&self) {
        if !self.holding() {
            kpanic!("release: {} not held by this cpu", self.name);
        }
        self.cpu.store(NO_CPU, Ordering::Relaxed);
        self.locked.store(false, Ordering::Release);
        pop_off();
    }

    /// Is the lock held by the executing CPU?
    pub fn holding(&self) -> bool {
        push_off();
        let held =
            self.locked.load(Ordering::Relaxed) && self.cpu.load(Ordering::Relaxed) == cpu::id();
        pop_off();
        held
    }

    /// Releases a lock whose guard lives in another kernel context.
    ///
    /// # Safety
    /// The lock must have been acquired on this CPU by a context that switched
    /// here and will never drop its own guard.
    pub unsafe fn force_release(&self) {
        self.release();
    }

    /// Reads the data without taking the lock.
    ///
    /// # Safety
    /// The result may be torn by concurrent writers. Only for best-effort
    /// debugging output.
    pub unsafe fn get_unsynchronized(&self) -> &T {
        &*self.data.get()
    }
}

/// RAII guard; dropping it releases the lock and restores interrupts.
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    // Must be released on the CPU that acquired it.
    _not_send: PhantomData<*mut ()>,
}

impl<'a, T> SpinLockGuard<'a, T> {
    /// The lock this guard holds.
    pub fn lock_ref(this: &Self) -> &'a SpinLock<T> {
        this.lock
    }
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
