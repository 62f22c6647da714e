use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::config::OpenOptions;
use crate::error::{Ext4Error, Result};
use crate::fs_core::dir_reader::DirReader;
use crate::fs_core::file_reader::FileReader;
use crate::fs_core::group_resolver::GroupResolver;
use crate::fs_core::inode_reader::InodeReader;
use crate::fs_core::path_resolver::PathResolver;
use crate::fs_core::superblock_manager::SuperBlockManager;
use crate::fs_core::symlink::SymlinkReader;
use crate::io::block_reader::BlockReader;
use crate::layout::dir_entry::DirEntry;
use crate::layout::inode::Inode;
use crate::layout::superblock::SuperBlock;
use crate::traits::image_source::ImageSource;
use crate::traits::vfs::{FileSystem, InodeOps, StatFs};

/// Main read-only filesystem object that wires all modules together.
///
/// Owns the byte source for its whole lifetime; [`close`](Self::close)
/// hands it back. Every method takes `&self`, so one instance can be shared
/// across threads when the source is `Send`.
pub struct Ext4FileSystem<S: ImageSource> {
    reader: BlockReader<S>,
    pub sb_manager: SuperBlockManager,
}

impl Ext4FileSystem<std::fs::File> {
    /// Open an image file (or block device node) by path.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening ext image {}", path.display());
        Self::open(std::fs::File::open(path)?)
    }
}

impl<S: ImageSource> Ext4FileSystem<S> {
    /// Open with default [`OpenOptions`].
    pub fn open(source: S) -> Result<Self> {
        Self::open_with(source, &OpenOptions::default())
    }

    pub fn open_with(source: S, options: &OpenOptions) -> Result<Self> {
        let reader = BlockReader::new(source);
        let sb_manager = SuperBlockManager::load(&reader, options)?;

        if options.check_descriptors {
            GroupResolver::check_all(&reader, &sb_manager)?;
        }

        Ok(Self { reader, sb_manager })
    }

    /// Release the filesystem and return the byte source.
    pub fn close(self) -> S {
        self.reader.into_inner()
    }

    pub fn super_block(&self) -> &SuperBlock {
        &self.sb_manager.super_block
    }

    /// The root directory inode.
    pub fn root(&self) -> Result<Inode> {
        InodeReader::read_root_inode(&self.reader, &self.sb_manager)
    }

    pub fn read_inode(&self, ino: u32) -> Result<Inode> {
        InodeReader::read_inode(&self.reader, &self.sb_manager, ino)
    }

    pub fn resolve(&self, path: &str) -> Result<u32> {
        PathResolver::resolve(&self.reader, &self.sb_manager, path)
    }

    pub fn resolve_parent(&self, path: &str) -> Result<(u32, String)> {
        PathResolver::resolve_parent(&self.reader, &self.sb_manager, path)
    }

    /// Open the file at `path` for reading.
    ///
    /// The final component is not followed if it is a symbolic link, so
    /// links and directories are refused here; use
    /// [`read_link`](Self::read_link) and [`read_dir`](Self::read_dir).
    pub fn open_file(&self, path: &str) -> Result<File<'_, S>> {
        let ino = self.resolve(path)?;
        let inode = self.read_inode(ino)?;
        if inode.is_dir() {
            return Err(Ext4Error::invalid_input(format!("{path} is a directory")));
        }
        if inode.is_symlink() {
            return Err(Ext4Error::invalid_input(format!(
                "{path} is a symbolic link"
            )));
        }
        Ok(File {
            fs: self,
            ino,
            inode,
            pos: 0,
        })
    }

    /// Whole content of an opened file.
    pub fn read(&self, file: &File<'_, S>) -> Result<Vec<u8>> {
        FileReader::read_all(&self.reader, &self.sb_manager, &file.inode)
    }

    /// Convenience: resolve `path` and read all of it.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.open_file(path)?;
        self.read(&file)
    }

    /// Live entries of the directory at `path`, `.` and `..` included.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let inode = self.read_inode(self.resolve(path)?)?;
        if !inode.is_dir() {
            return Err(Ext4Error::NotDirectory(path.to_string()));
        }
        DirReader::read_live_entries(&self.reader, &self.sb_manager, &inode)
    }

    /// Inode metadata of `path` (the link itself for symbolic links).
    pub fn stat(&self, path: &str) -> Result<Inode> {
        self.read_inode(self.resolve(path)?)
    }

    pub fn read_link(&self, path: &str) -> Result<String> {
        let inode = self.stat(path)?;
        SymlinkReader::read_symlink(&self.reader, &self.sb_manager, &inode)
    }
}

impl<S: ImageSource> FileSystem for Ext4FileSystem<S> {
    fn stat_fs(&self) -> Result<StatFs> {
        let sb = &self.sb_manager.super_block;
        Ok(StatFs {
            block_size: self.sb_manager.block_size as u64,
            total_blocks: sb.block_count(),
            free_blocks: sb.free_blocks_count(),
            reserved_blocks: sb.reserved_block_count(),
            total_inodes: sb.s_inodes_count as u64,
            free_inodes: sb.s_free_inodes_count as u64,
            group_count: self.sb_manager.group_count,
            volume_name: sb.volume_name(),
        })
    }
}

impl<S: ImageSource> InodeOps for Ext4FileSystem<S> {
    fn lookup(&self, parent: u32, name: &[u8]) -> Result<u32> {
        let parent_inode = self.read_inode(parent)?;
        if !parent_inode.is_dir() {
            return Err(Ext4Error::NotDirectory(format!("inode {parent}")));
        }
        DirReader::lookup(&self.reader, &self.sb_manager, &parent_inode, name)
    }

    fn read(&self, ino: u32, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let inode = self.read_inode(ino)?;
        FileReader::read(&self.reader, &self.sb_manager, &inode, offset, buf)
    }

    fn readdir(&self, ino: u32) -> Result<Vec<DirEntry>> {
        let inode = self.read_inode(ino)?;
        DirReader::read_live_entries(&self.reader, &self.sb_manager, &inode)
    }

    fn readlink(&self, ino: u32) -> Result<String> {
        let inode = self.read_inode(ino)?;
        SymlinkReader::read_symlink(&self.reader, &self.sb_manager, &inode)
    }

    fn stat(&self, ino: u32) -> Result<Inode> {
        self.read_inode(ino)
    }
}

/// An opened regular file.
///
/// Borrows the filesystem it came from. Besides positional
/// [`read_at`](Self::read_at) it implements [`std::io::Read`] and
/// [`std::io::Seek`] over its own cursor.
pub struct File<'fs, S: ImageSource> {
    fs: &'fs Ext4FileSystem<S>,
    ino: u32,
    inode: Inode,
    pos: u64,
}

impl<S: ImageSource> File<'_, S> {
    pub fn ino(&self) -> u32 {
        self.ino
    }

    pub fn inode(&self) -> &Inode {
        &self.inode
    }

    pub fn size(&self) -> u64 {
        self.inode.i_size
    }

    /// Read at `offset` without moving the cursor; returns bytes read,
    /// 0 at end of file.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        FileReader::read(&self.fs.reader, &self.fs.sb_manager, &self.inode, offset, buf)
    }
}

impl<S: ImageSource> Read for File<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(self.pos, buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: ImageSource> Seek for File<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.inode.i_size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of file")
        })?;
        self.pos = target;
        Ok(target)
    }
}

impl<S: ImageSource> std::fmt::Debug for File<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("ino", &self.ino)
            .field("size", &self.inode.i_size)
            .field("pos", &self.pos)
            .finish()
    }
}
