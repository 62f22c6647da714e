use log::debug;

use crate::error::{Ext4Error, Result};
use crate::fs_core::superblock_manager::SuperBlockManager;
use crate::io::block_reader::BlockReader;
use crate::layout::block_group::{BlockGroupDesc, DESC_SIZE_64};
use crate::layout::superblock::SUPER_BLOCK_OFFSET;
use crate::traits::image_source::ImageSource;

/// Block group descriptor resolver.
///
/// Decodes one descriptor per call straight from the descriptor table.
/// Nothing is cached, so repeated resolution of the same group always
/// returns the same value and has no effect beyond the serialized read.
pub struct GroupResolver;

impl GroupResolver {
    /// First block of the descriptor table: the block after the one holding
    /// the super block (block 2 for 1 KiB blocks, block 1 otherwise).
    pub fn desc_table_start(block_size: usize) -> u64 {
        SUPER_BLOCK_OFFSET / block_size as u64 + 1
    }

    /// Absolute byte offset of the descriptor for `group`.
    pub fn desc_offset(super_block_manager: &SuperBlockManager, group: u64) -> u64 {
        let block_size = super_block_manager.block_size as u64;
        Self::desc_table_start(super_block_manager.block_size) * block_size
            + group * super_block_manager.desc_size as u64
    }

    /// Read and parse the descriptor of `group`.
    pub fn resolve<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        group: u64,
    ) -> Result<BlockGroupDesc> {
        if group >= super_block_manager.group_count {
            return Err(Ext4Error::invalid_input(format!(
                "block group {group} out of range ({} groups)",
                super_block_manager.group_count
            )));
        }

        let is_64bit = super_block_manager.is_64bit;
        let offset = Self::desc_offset(super_block_manager, group);

        // Larger 64-bit records only append fields we do not decode.
        let mut raw = [0u8; DESC_SIZE_64];
        let len = super_block_manager.desc_size.min(DESC_SIZE_64);
        reader.read_bytes(offset, &mut raw[..len])?;

        let desc = BlockGroupDesc::parse(&raw[..len], is_64bit)?;
        debug!(
            "group {}: inode table at block {}, {} free inodes",
            group,
            desc.inode_table(is_64bit),
            desc.free_inodes_count(is_64bit)
        );
        Ok(desc)
    }

    /// Physical block number of the inode table for `group`.
    pub fn inode_table_block<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        group: u64,
    ) -> Result<u64> {
        let desc = Self::resolve(reader, super_block_manager, group)?;
        Ok(desc.inode_table(super_block_manager.is_64bit))
    }

    /// Resolve every descriptor and check that each inode table fits inside
    /// the filesystem.
    pub fn check_all<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
    ) -> Result<()> {
        let block_count = super_block_manager.super_block.block_count();
        let table_bytes = super_block_manager.inodes_per_group() as u64
            * super_block_manager.inode_size as u64;
        let table_blocks = table_bytes.div_ceil(super_block_manager.block_size as u64);

        for group in 0..super_block_manager.group_count {
            let table = Self::inode_table_block(reader, super_block_manager, group)?;
            let past_end = table.checked_add(table_blocks).is_none_or(|end| end > block_count);
            if table == 0 || past_end {
                return Err(Ext4Error::corrupted(format!(
                    "group {group}: inode table at block {table} outside filesystem"
                )));
            }
        }
        Ok(())
    }
}
