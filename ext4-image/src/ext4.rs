//! Read-only decoder for ext2/ext3/ext4 filesystem images.
//!
//! ```no_run
//! use ext4_image::Ext4FileSystem;
//!
//! let fs = Ext4FileSystem::open_path("disk.img")?;
//! for entry in fs.read_dir("/etc")? {
//!     println!("{} -> inode {}", entry.name_lossy(), entry.inode);
//! }
//! let hosts = fs.read_file("/etc/hosts")?;
//! # let _ = hosts;
//! # Ok::<(), ext4_image::Ext4Error>(())
//! ```

pub mod config;
pub mod error;
pub mod fs;
pub mod io;
pub mod layout;
pub mod traits;

// The directory is `core/`, but that name shadows the `core` crate.
// We use `#[path]` so the directory stays `core/` while the Rust module is `fs_core`.
#[path = "core/mod.rs"]
pub mod fs_core;

#[cfg(test)]
mod tests;

// Re-exports
pub use config::OpenOptions;
pub use error::{ErrorKind, Ext4Error, Result};
pub use fs::{Ext4FileSystem, File};
pub use fs_core::block_mapper::{BlockMap, BlockMapper, MappedBlock};
pub use fs_core::dir_reader::DirReader;
pub use fs_core::file_reader::FileReader;
pub use fs_core::group_resolver::GroupResolver;
pub use fs_core::inode_reader::{InodeLocation, InodeReader};
pub use fs_core::path_resolver::PathResolver;
pub use fs_core::superblock_manager::SuperBlockManager;
pub use io::block_reader::BlockReader;
pub use layout::block_group::BlockGroupDesc;
pub use layout::dir_entry::{DirEntry, FileType as DirEntryFileType};
pub use layout::extent::{EXTENT_HEADER_MAGIC, Extent, ExtentHeader, ExtentIndex, ExtentNode};
pub use layout::inode::{BlockMapping, FileType, Inode};
pub use layout::superblock::SuperBlock;
pub use traits::image_source::ImageSource;
pub use traits::vfs::{FileSystem, InodeOps, StatFs};
