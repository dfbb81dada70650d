//! Filesystem collaborator
//!
//! Open files and inodes are reference-counted objects owned by the
//! filesystem layer; processes hold opaque handles to them. Inode releases
//! may write to disk and must happen inside a log transaction bracketed by
//! [`FileSystem::begin_op`] and [`FileSystem::end_op`].

use spin::Once;

/// Handle to an open file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileRef(pub u64);

/// Handle to an in-memory inode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InodeRef(pub u64);

pub trait FileSystem: Sync {
    /// One-time setup run from the first process context, where sleeping is allowed.
    fn init_from_first_process(&self) {}

    /// Resolves `path` to a referenced inode.
    fn resolve(&self, path: &str) -> Option<InodeRef>;

    /// Takes another reference on an open file.
    fn dup_file(&self, file: FileRef) -> FileRef;

    fn close_file(&self, file: FileRef);

    /// Takes another reference on an inode.
    fn dup_inode(&self, inode: InodeRef) -> InodeRef;

    /// Drops an inode reference. Callers hold a transaction.
    fn put_inode(&self, inode: InodeRef);

    fn begin_op(&self);

    fn end_op(&self);
}

static FILESYSTEM: Once<&'static dyn FileSystem> = Once::new();

pub fn install(fs: &'static dyn FileSystem) {
    FILESYSTEM.call_once(|| fs);
}

pub fn filesystem() -> &'static dyn FileSystem {
    match FILESYSTEM.get() {
        Some(fs) => *fs,
        None => kpanic!("filesystem collaborator used before install"),
    }
}
