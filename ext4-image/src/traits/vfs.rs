use crate::error::Result;
use crate::layout::dir_entry::DirEntry;
use crate::layout::inode::Inode;

/// Volume-wide counters, straight from the super block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFs {
    pub block_size: u64,
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub reserved_blocks: u64,
    pub total_inodes: u64,
    pub free_inodes: u64,
    pub group_count: u64,
    /// Volume label with trailing NULs removed.
    pub volume_name: String,
}

/// Queries about the mounted image as a whole.
pub trait FileSystem {
    fn stat_fs(&self) -> Result<StatFs>;
}

/// Read-only operations keyed by inode number.
///
/// Inode numbers are the on-disk ones; the root directory is inode 2.
/// Names are raw bytes, compared without any encoding step.
pub trait InodeOps {
    /// Inode number of `name` inside directory `parent`.
    fn lookup(&self, parent: u32, name: &[u8]) -> Result<u32>;
    /// Positional read; returns 0 at end of file.
    fn read(&self, ino: u32, offset: u64, buf: &mut [u8]) -> Result<usize>;
    /// Live entries of directory `ino`.
    fn readdir(&self, ino: u32) -> Result<Vec<DirEntry>>;
    fn readlink(&self, ino: u32) -> Result<String>;
    fn stat(&self, ino: u32) -> Result<Inode>;
}
