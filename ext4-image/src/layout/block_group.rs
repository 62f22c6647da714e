use super::{combine_lo_hi, read_u16_le, read_u32_le};
use crate::error::{Ext4Error, Result};

/// Size of a descriptor without the 64BIT feature.
pub const DESC_SIZE_32: usize = 32;

/// Minimum size of a descriptor with the 64BIT feature.
pub const DESC_SIZE_64: usize = 64;

/// Parsed block group descriptor.
///
/// Bridges from the super block to per-group metadata (bitmaps, inode table).
/// 32 bytes in non-64-bit mode, 64 bytes in 64-bit mode. The `_hi` halves
/// stay zero unless the record was parsed as 64-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGroupDesc {
    // location pointers (lo / hi)
    pub bg_block_bitmap_lo: u32,
    pub bg_block_bitmap_hi: u32,
    pub bg_inode_bitmap_lo: u32,
    pub bg_inode_bitmap_hi: u32,
    pub bg_inode_table_lo: u32,
    pub bg_inode_table_hi: u32,

    // counters (lo / hi)
    pub bg_free_blocks_count_lo: u16,
    pub bg_free_blocks_count_hi: u16,
    pub bg_free_inodes_count_lo: u16,
    pub bg_free_inodes_count_hi: u16,
    pub bg_used_dirs_count_lo: u16,
    pub bg_used_dirs_count_hi: u16,
    pub bg_itable_unused_lo: u16,
    pub bg_itable_unused_hi: u16,

    // flags & checksums
    pub bg_flags: u16,
    pub bg_exclude_bitmap_lo: u32,
    pub bg_exclude_bitmap_hi: u32,
    pub bg_block_bitmap_csum_lo: u16,
    pub bg_block_bitmap_csum_hi: u16,
    pub bg_inode_bitmap_csum_lo: u16,
    pub bg_inode_bitmap_csum_hi: u16,
    pub bg_checksum: u16,
}

impl BlockGroupDesc {
    /// Parse a block group descriptor from raw bytes.
    ///
    /// - Non-64-bit: reads 32 bytes, hi fields are zero.
    /// - 64-bit: reads 64 bytes for the hi fields.
    pub fn parse(raw: &[u8], is_64bit: bool) -> Result<BlockGroupDesc> {
        if raw.len() < DESC_SIZE_32 {
            return Err(Ext4Error::corrupted("block group desc too small"));
        }

        if is_64bit && raw.len() < DESC_SIZE_64 {
            return Err(Ext4Error::corrupted(
                "64-bit block group desc requires >= 64 bytes",
            ));
        }

        let hi16 = |offset| if is_64bit { read_u16_le(raw, offset) } else { 0 };
        let hi32 = |offset| if is_64bit { read_u32_le(raw, offset) } else { 0 };

        Ok(BlockGroupDesc {
            bg_block_bitmap_lo: read_u32_le(raw, 0x00),
            bg_inode_bitmap_lo: read_u32_le(raw, 0x04),
            bg_inode_table_lo: read_u32_le(raw, 0x08),
            bg_free_blocks_count_lo: read_u16_le(raw, 0x0C),
            bg_free_inodes_count_lo: read_u16_le(raw, 0x0E),
            bg_used_dirs_count_lo: read_u16_le(raw, 0x10),
            bg_flags: read_u16_le(raw, 0x12),
            bg_exclude_bitmap_lo: read_u32_le(raw, 0x14),
            bg_block_bitmap_csum_lo: read_u16_le(raw, 0x18),
            bg_inode_bitmap_csum_lo: read_u16_le(raw, 0x1A),
            bg_itable_unused_lo: read_u16_le(raw, 0x1C),
            bg_checksum: read_u16_le(raw, 0x1E),

            // 64-bit hi fields
            bg_block_bitmap_hi: hi32(0x20),
            bg_inode_bitmap_hi: hi32(0x24),
            bg_inode_table_hi: hi32(0x28),
            bg_free_blocks_count_hi: hi16(0x2C),
            bg_free_inodes_count_hi: hi16(0x2E),
            bg_used_dirs_count_hi: hi16(0x30),
            bg_itable_unused_hi: hi16(0x32),
            bg_exclude_bitmap_hi: hi32(0x34),
            bg_block_bitmap_csum_hi: hi16(0x38),
            bg_inode_bitmap_csum_hi: hi16(0x3A),
        })
    }

    // Combined accessors (hi << 32 | lo)

    /// Physical block number of the block bitmap.
    pub fn block_bitmap(&self, is_64bit: bool) -> u64 {
        combine_lo_hi(self.bg_block_bitmap_lo, self.bg_block_bitmap_hi, is_64bit)
    }

    /// Physical block number of the inode bitmap.
    pub fn inode_bitmap(&self, is_64bit: bool) -> u64 {
        combine_lo_hi(self.bg_inode_bitmap_lo, self.bg_inode_bitmap_hi, is_64bit)
    }

    /// Physical block number of the inode table.
    pub fn inode_table(&self, is_64bit: bool) -> u64 {
        combine_lo_hi(self.bg_inode_table_lo, self.bg_inode_table_hi, is_64bit)
    }

    /// Free blocks count in this group.
    pub fn free_blocks_count(&self, is_64bit: bool) -> u32 {
        join16(
            self.bg_free_blocks_count_lo,
            self.bg_free_blocks_count_hi,
            is_64bit,
        )
    }

    /// Free inodes count in this group.
    pub fn free_inodes_count(&self, is_64bit: bool) -> u32 {
        join16(
            self.bg_free_inodes_count_lo,
            self.bg_free_inodes_count_hi,
            is_64bit,
        )
    }

    /// Used directory count in this group.
    pub fn used_dirs_count(&self, is_64bit: bool) -> u32 {
        join16(
            self.bg_used_dirs_count_lo,
            self.bg_used_dirs_count_hi,
            is_64bit,
        )
    }
}

fn join16(lo: u16, hi: u16, is_64bit: bool) -> u32 {
    if is_64bit {
        ((hi as u32) << 16) | lo as u32
    } else {
        lo as u32
    }
}
