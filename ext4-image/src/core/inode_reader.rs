use log::trace;

use crate::error::{Ext4Error, Result};
use crate::fs_core::group_resolver::GroupResolver;
use crate::fs_core::superblock_manager::SuperBlockManager;
use crate::io::block_reader::BlockReader;
use crate::layout::inode::{Inode, ROOT_INO};
use crate::traits::image_source::ImageSource;

/// Where an inode record lives on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InodeLocation {
    /// Owning block group: `(ino - 1) / inodes_per_group`.
    pub group: u64,
    /// Slot inside the group's inode table: `(ino - 1) % inodes_per_group`.
    pub index: u32,
}

/// Inode reader: locates and reads inodes.
///
/// Stateless: all context is passed as parameters.
pub struct InodeReader;

impl InodeReader {
    /// Compute the owning group and table slot of `ino`.
    ///
    /// Inode numbers start at 1; 0 and numbers past `s_inodes_count` are
    /// rejected as caller errors.
    pub fn locate(super_block_manager: &SuperBlockManager, ino: u32) -> Result<InodeLocation> {
        let super_block = &super_block_manager.super_block;
        if ino == 0 {
            return Err(Ext4Error::invalid_input("inode number 0 does not exist"));
        }
        if ino > super_block.s_inodes_count {
            return Err(Ext4Error::invalid_input(format!(
                "inode {ino} out of range ({} inodes)",
                super_block.s_inodes_count
            )));
        }

        let inodes_per_group = super_block.s_inodes_per_group;
        Ok(InodeLocation {
            group: ((ino - 1) / inodes_per_group) as u64,
            index: (ino - 1) % inodes_per_group,
        })
    }

    /// Read and parse the inode with the given inode number.
    ///
    /// 1. Locate group and index.
    /// 2. `table_block` from the group's descriptor.
    /// 3. `byte_offset = table_block * block_size + index * inode_size`,
    ///    an overflow being a corrupted descriptor
    /// 4. Read `inode_size` bytes → `Inode::parse()`
    pub fn read_inode<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        ino: u32,
    ) -> Result<Inode> {
        let location = Self::locate(super_block_manager, ino)?;
        let inode_size = super_block_manager.inode_size;
        let block_size = super_block_manager.block_size as u64;

        let table_block =
            GroupResolver::inode_table_block(reader, super_block_manager, location.group)?;
        let byte_offset = table_block
            .checked_mul(block_size)
            .and_then(|base| base.checked_add(location.index as u64 * inode_size as u64))
            .ok_or_else(|| {
                Ext4Error::corrupted(format!(
                    "group {}: inode table block {table_block} overflows the byte range",
                    location.group
                ))
            })?;

        trace!(
            "inode {}: group {} index {} at byte {}",
            ino, location.group, location.index, byte_offset
        );

        let mut raw = vec![0u8; inode_size];
        reader.read_bytes(byte_offset, &mut raw)?;

        Inode::parse(
            &raw,
            super_block_manager.has_large_file(),
            super_block_manager.has_huge_file(),
        )
    }

    /// Read the root directory inode (always inode 2).
    pub fn read_root_inode<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
    ) -> Result<Inode> {
        Self::read_inode(reader, super_block_manager, ROOT_INO)
    }
}
