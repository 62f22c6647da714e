use log::{trace, warn};

use crate::error::{Ext4Error, Result};
use crate::fs_core::block_mapper::BlockMapper;
use crate::fs_core::superblock_manager::SuperBlockManager;
use crate::io::block_reader::BlockReader;
use crate::layout::dir_entry::DirEntry;
use crate::layout::inode::Inode;
use crate::traits::image_source::ImageSource;

/// Directory reader for `readdir` and `lookup`.
///
/// Only linear directories are decoded; hash-indexed ones are refused
/// rather than read through their leaf blocks.
pub struct DirReader;

impl DirReader {
    /// Read every record of a directory, unused slots included, in on-disk
    /// order.
    pub fn read_entries<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        dir_inode: &Inode,
    ) -> Result<Vec<DirEntry>> {
        if !dir_inode.is_dir() {
            return Err(Ext4Error::NotDirectory(format!(
                "inode with mode {:#o}",
                dir_inode.i_mode
            )));
        }
        if dir_inode.uses_htree() {
            return Err(Ext4Error::unsupported("hash-indexed directory"));
        }

        let has_filetype = super_block_manager.has_filetype();
        let block_size = super_block_manager.block_size;
        let mut block_buf = vec![0u8; block_size];
        let mut out = Vec::new();
        let mut expected = 0u64;

        for mapped in BlockMapper::map_blocks(dir_inode, super_block_manager) {
            let mapped = mapped?;
            if mapped.logical != expected {
                return Err(Ext4Error::corrupted(format!(
                    "directory has a hole at logical block {expected}"
                )));
            }
            expected += 1;

            if mapped.uninitialized {
                warn!(
                    "skipping uninitialized directory block {} (physical {})",
                    mapped.logical, mapped.physical
                );
                continue;
            }

            reader.read_block(mapped.physical, &mut block_buf)?;
            trace!(
                "dir block {} at physical {}",
                mapped.logical, mapped.physical
            );

            let mut off = 0usize;
            while off < block_size {
                let entry = DirEntry::parse(&block_buf[off..], has_filetype)?;
                off += entry.rec_len as usize;
                out.push(entry);
            }
        }

        Ok(out)
    }

    /// Entries that name a live inode.
    pub fn read_live_entries<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        dir_inode: &Inode,
    ) -> Result<Vec<DirEntry>> {
        let mut entries = Self::read_entries(reader, super_block_manager, dir_inode)?;
        entries.retain(|entry| !entry.is_unused());
        Ok(entries)
    }

    /// Linear lookup in a directory; names compare byte for byte.
    pub fn lookup<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        dir_inode: &Inode,
        name: &[u8],
    ) -> Result<u32> {
        Self::read_live_entries(reader, super_block_manager, dir_inode)?
            .into_iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.inode)
            .ok_or_else(|| Ext4Error::NotFound(String::from_utf8_lossy(name).into_owned()))
    }
}
