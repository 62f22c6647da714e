use log::{debug, warn};

use crate::config::OpenOptions;
use crate::error::Result;
use crate::io::block_reader::BlockReader;
use crate::layout::superblock::{SUPER_BLOCK_OFFSET, SUPER_BLOCK_SIZE, SuperBlock};
use crate::traits::image_source::ImageSource;

/// Super block manager.
///
/// Loads the super block from the image, validates it, and caches the
/// commonly used derived parameters so that every caller does not need to
/// re-derive them. Immutable once loaded.
///
/// This is the very first step of opening an image.
#[derive(Debug, Clone)]
pub struct SuperBlockManager {
    /// The parsed super block.
    pub super_block: SuperBlock,
    /// Filesystem block size in bytes (`1024 << s_log_block_size`).
    pub block_size: usize,
    /// Number of block groups.
    pub group_count: u64,
    /// Whether the 64-bit feature is enabled.
    pub is_64bit: bool,
    /// Block group descriptor size (64+ if 64-bit, else 32).
    pub desc_size: usize,
    /// Inode record size.
    pub inode_size: usize,
}

impl SuperBlockManager {
    /// Load the super block via the given block reader.
    ///
    /// 1. Read 1024 raw bytes from byte offset 1024.
    /// 2. `SuperBlock::parse()` (magic).
    /// 3. `validate()` (geometry, group-count invariant).
    /// 4. `check_features()`: unknown incompat bits fail the load only under
    ///    strict options.
    /// 5. Cache derived parameters.
    pub fn load<S: ImageSource>(reader: &BlockReader<S>, options: &OpenOptions) -> Result<Self> {
        let mut raw = [0u8; SUPER_BLOCK_SIZE];
        reader.read_bytes(SUPER_BLOCK_OFFSET, &mut raw)?;

        let super_block = SuperBlock::parse(&raw)?;
        super_block.validate()?;

        match super_block.check_features() {
            Ok(0) => {}
            Ok(unknown_ro_compat) => warn!(
                "unknown ro_compat features {:#x}; reading is still safe",
                unknown_ro_compat
            ),
            Err(e) if options.strict_features => return Err(e),
            Err(e) => warn!("{}; opening anyway, strict feature checks are off", e),
        }

        Ok(Self::from_super_block(super_block))
    }

    /// Derive cached parameters from an already validated super block.
    pub fn from_super_block(super_block: SuperBlock) -> Self {
        let manager = SuperBlockManager {
            block_size: super_block.block_size(),
            group_count: super_block.group_count(),
            is_64bit: super_block.has_64bit(),
            desc_size: super_block.desc_size(),
            inode_size: super_block.inode_size() as usize,
            super_block,
        };

        debug!(
            "ext super block: block_size={} blocks={} groups={} inodes={} inode_size={} 64bit={}",
            manager.block_size,
            manager.super_block.block_count(),
            manager.group_count,
            manager.super_block.s_inodes_count,
            manager.inode_size,
            manager.is_64bit,
        );

        manager
    }

    pub fn inodes_per_group(&self) -> u32 {
        self.super_block.s_inodes_per_group
    }

    pub fn has_filetype(&self) -> bool {
        self.super_block.has_filetype()
    }

    pub fn has_large_file(&self) -> bool {
        self.super_block.has_large_file()
    }

    pub fn has_huge_file(&self) -> bool {
        self.super_block.has_huge_file()
    }

    /// Blocks needed to hold `size` bytes: `ceil(size / block_size)`.
    pub fn blocks_for_size(&self, size: u64) -> u64 {
        size.div_ceil(self.block_size as u64)
    }
}
