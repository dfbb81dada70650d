//! Memory collaborator
//!
//! Physical pages and user address spaces are managed outside the process
//! core. The scheduler only needs the operations below, reached through an
//! installed [`Memory`] implementation.

use spin::Once;

use crate::param::PGSIZE;

/// Physical address of one page-sized block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysPage(pub usize);

/// Opaque root of a user page table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AddressSpace(pub u64);

/// A process kernel stack: exactly one page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelStack {
    page: PhysPage,
}

impl KernelStack {
    pub const fn new(page: PhysPage) -> Self {
        Self { page }
    }

    pub const fn page(self) -> PhysPage {
        self.page
    }

    pub const fn base(self) -> usize {
        self.page.0
    }

    pub const fn top(self) -> usize {
        self.page.0 + PGSIZE
    }

    pub const fn contains(self, addr: usize) -> bool {
        addr >= self.base() && addr < self.top()
    }
}

pub trait Memory: Sync {
    fn alloc_page(&self) -> Option<PhysPage>;

    fn free_page(&self, page: PhysPage);

    /// Builds a fresh address space holding `image` at virtual address 0.
    fn create_address_space(&self, image: &[u8]) -> Option<AddressSpace>;

    /// Copies the first `size` bytes of `parent`'s user memory into a new space.
    fn duplicate_address_space(&self, parent: AddressSpace, size: usize) -> Option<AddressSpace>;

    /// Grows or shrinks user memory from `old_size` to `new_size`, returning the new size.
    fn resize(&self, space: AddressSpace, old_size: usize, new_size: usize) -> Option<usize>;

    fn destroy_address_space(&self, space: AddressSpace);

    /// Binds `space` and `kstack` to the executing CPU.
    fn activate(&self, space: AddressSpace, kstack: KernelStack);

    /// Returns the executing CPU to the kernel-only address space.
    fn activate_kernel(&self);
}

static MEMORY: Once<&'static dyn Memory> = Once::new();

pub fn install(memory: &'static dyn Memory) {
    MEMORY.call_once(|| memory);
}

pub fn memory() -> &'static dyn Memory {
    match MEMORY.get() {
        Some(memory) => *memory,
        None => kpanic!("memory collaborator used before install"),
    }
}
