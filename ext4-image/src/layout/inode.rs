use super::extent::ExtentNode;
use super::{combine_lo_hi, read_u16_le, read_u32_le};
use crate::error::{Ext4Error, Result};

// Mode constants (i_mode & S_IFMT)
pub const S_IFMT: u16 = 0xF000;
pub const S_IFSOCK: u16 = 0xC000;
pub const S_IFLNK: u16 = 0xA000;
pub const S_IFREG: u16 = 0x8000;
pub const S_IFBLK: u16 = 0x6000;
pub const S_IFDIR: u16 = 0x4000;
pub const S_IFCHR: u16 = 0x2000;
pub const S_IFIFO: u16 = 0x1000;

// Inode flags (i_flags)
pub const INDEX_FL: u32 = 0x0000_1000;
pub const HUGE_FILE_FL: u32 = 0x0004_0000;
pub const EXTENTS_FL: u32 = 0x0008_0000;
pub const INLINE_DATA_FL: u32 = 0x1000_0000;

/// Inode number of the root directory.
pub const ROOT_INO: u32 = 2;

/// Inode record size of revision 0; everything past it is optional.
pub const GOOD_OLD_INODE_SIZE: usize = 128;

/// Size of the `i_block` payload.
pub const I_BLOCK_SIZE: usize = 60;

/// Direct pointer slots in the classic block map.
pub const DIRECT_BLOCKS: usize = 12;
/// First indirect slot; the double and triple indirect slots follow it.
pub const IND_BLOCK: usize = 12;

const SECTOR_SIZE: u64 = 512;

// FileType enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Unknown,
    RegularFile,
    Directory,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Symlink,
}

/// How the 60-byte `i_block` payload maps logical blocks.
///
/// Chosen once when the inode is decoded, from `EXTENTS_FL` alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockMapping {
    /// Classic map: 12 direct pointers, then single/double/triple indirect.
    Direct { pointers: [u32; 15] },
    /// Extent tree rooted in the payload.
    Extent(ExtentNode),
}

impl BlockMapping {
    /// Decode the payload according to the inode flags.
    pub fn parse(i_block: &[u8; I_BLOCK_SIZE], i_flags: u32) -> Result<Self> {
        if i_flags & EXTENTS_FL != 0 {
            return Ok(BlockMapping::Extent(ExtentNode::parse(i_block)?));
        }
        let mut pointers = [0u32; 15];
        for (i, ptr) in pointers.iter_mut().enumerate() {
            *ptr = read_u32_le(i_block, i * 4);
        }
        Ok(BlockMapping::Direct { pointers })
    }
}

/// Parsed inode.
///
/// Core metadata for every file, directory, and symlink.
/// uid/gid/size fields are already combined from their lo/hi halves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub i_mode: u16,
    /// Combined: `(uid_hi << 16) | uid_lo`
    pub i_uid: u32,
    /// Combined: `(gid_hi << 16) | gid_lo`
    pub i_gid: u32,
    /// Combined: `(size_hi << 32) | size_lo` when LARGE_FILE is set.
    pub i_size: u64,
    pub i_atime: u32,
    pub i_ctime: u32,
    pub i_mtime: u32,
    pub i_dtime: u32,
    pub i_links_count: u16,
    /// Combined from lo + hi, in 512-byte units.
    pub i_blocks: u64,
    pub i_flags: u32,
    /// Raw 60-byte block map / extent tree root.
    pub i_block: [u8; I_BLOCK_SIZE],
    pub i_generation: u32,
    /// Combined: `(file_acl_hi << 32) | file_acl_lo`
    pub i_file_acl: u64,
    /// Extra inode size beyond 128 bytes (0 if inode_size <= 128).
    pub i_extra_isize: u16,
    /// Combined: `(checksum_hi << 16) | checksum_lo`
    pub i_checksum: u32,
    pub i_ctime_extra: u32,
    pub i_mtime_extra: u32,
    pub i_atime_extra: u32,
    pub i_crtime: u32,
    pub i_crtime_extra: u32,
    pub i_version_hi: u32,
    pub i_projid: u32,
    /// Decoded interpretation of `i_block`.
    pub mapping: BlockMapping,
}

impl Inode {
    /// Parse an inode from raw bytes.
    ///
    /// `raw.len()` must be >= 128. `large_file` is the LARGE_FILE
    /// ro_compat predicate gating `i_size_high`; `huge_file` is the
    /// HUGE_FILE predicate gating `i_blocks_high`.
    ///
    /// 1. Read the fixed 128-byte base fields.
    /// 2. Read the extended fields that `i_extra_isize` says are present.
    /// 3. Combine split fields.
    /// 4. Decode `i_block` into a [`BlockMapping`].
    pub fn parse(raw: &[u8], large_file: bool, huge_file: bool) -> Result<Inode> {
        if raw.len() < GOOD_OLD_INODE_SIZE {
            return Err(Ext4Error::corrupted("inode buffer < 128 bytes"));
        }

        // ── Base fields (0x00 .. 0x80) ──────────────────────────────────────

        let i_mode = read_u16_le(raw, 0x00);
        let i_uid_lo = read_u16_le(raw, 0x02);
        let i_size_lo = read_u32_le(raw, 0x04);
        let i_atime = read_u32_le(raw, 0x08);
        let i_ctime = read_u32_le(raw, 0x0C);
        let i_mtime = read_u32_le(raw, 0x10);
        let i_dtime = read_u32_le(raw, 0x14);
        let i_gid_lo = read_u16_le(raw, 0x18);
        let i_links_count = read_u16_le(raw, 0x1A);
        let i_blocks_lo = read_u32_le(raw, 0x1C);
        let i_flags = read_u32_le(raw, 0x20);
        // 0x24: i_osd1 (skipped)

        let mut i_block = [0u8; I_BLOCK_SIZE];
        i_block.copy_from_slice(&raw[0x28..0x64]);

        let i_generation = read_u32_le(raw, 0x64);
        let i_file_acl_lo = read_u32_le(raw, 0x68);
        let i_size_hi = read_u32_le(raw, 0x6C);
        // 0x70: i_obso_faddr (skipped)

        // osd2 fields (Linux-specific, 0x74 .. 0x80)

        let i_blocks_hi = read_u16_le(raw, 0x74);
        let i_file_acl_hi = read_u16_le(raw, 0x76);
        let i_uid_hi = read_u16_le(raw, 0x78);
        let i_gid_hi = read_u16_le(raw, 0x7A);
        let i_checksum_lo = read_u16_le(raw, 0x7C);

        // Extended fields (0x80+): each is valid only if it lies inside both
        // the record and 128 + i_extra_isize.

        let i_extra_isize = if raw.len() >= 0x82 {
            read_u16_le(raw, 0x80)
        } else {
            0
        };
        let extra_end = (GOOD_OLD_INODE_SIZE + i_extra_isize as usize).min(raw.len());
        let extra16 = |offset: usize| {
            if offset + 2 <= extra_end {
                read_u16_le(raw, offset)
            } else {
                0
            }
        };
        let extra32 = |offset: usize| {
            if offset + 4 <= extra_end {
                read_u32_le(raw, offset)
            } else {
                0
            }
        };

        let i_checksum_hi = extra16(0x82);

        let mapping = BlockMapping::parse(&i_block, i_flags)?;

        Ok(Inode {
            i_mode,
            i_uid: ((i_uid_hi as u32) << 16) | i_uid_lo as u32,
            i_gid: ((i_gid_hi as u32) << 16) | i_gid_lo as u32,
            i_size: combine_lo_hi(i_size_lo, i_size_hi, large_file),
            i_atime,
            i_ctime,
            i_mtime,
            i_dtime,
            i_links_count,
            i_blocks: combine_lo_hi(i_blocks_lo, i_blocks_hi as u32, huge_file),
            i_flags,
            i_block,
            i_generation,
            i_file_acl: combine_lo_hi(i_file_acl_lo, i_file_acl_hi as u32, true),
            i_extra_isize,
            i_checksum: ((i_checksum_hi as u32) << 16) | i_checksum_lo as u32,
            i_ctime_extra: extra32(0x84),
            i_mtime_extra: extra32(0x88),
            i_atime_extra: extra32(0x8C),
            i_crtime: extra32(0x90),
            i_crtime_extra: extra32(0x94),
            i_version_hi: extra32(0x98),
            i_projid: extra32(0x9C),
            mapping,
        })
    }

    // File type helpers

    /// Determine the file type from `i_mode & S_IFMT`.
    pub fn file_type(&self) -> FileType {
        match self.i_mode & S_IFMT {
            S_IFREG => FileType::RegularFile,
            S_IFDIR => FileType::Directory,
            S_IFLNK => FileType::Symlink,
            S_IFCHR => FileType::CharDevice,
            S_IFBLK => FileType::BlockDevice,
            S_IFIFO => FileType::Fifo,
            S_IFSOCK => FileType::Socket,
            _ => FileType::Unknown,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.i_mode & S_IFMT == S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        self.i_mode & S_IFMT == S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        self.i_mode & S_IFMT == S_IFLNK
    }

    /// Permission bits (`i_mode & 0o7777`).
    pub fn permissions(&self) -> u16 {
        self.i_mode & 0o7777
    }

    // Flag helpers

    /// Whether the inode uses an extent tree (vs. the classic block map).
    pub fn uses_extents(&self) -> bool {
        self.i_flags & EXTENTS_FL != 0
    }

    /// Whether the directory uses HTree indexing.
    pub fn uses_htree(&self) -> bool {
        self.i_flags & INDEX_FL != 0
    }

    /// Whether the inode stores data inline (in the i_block area).
    pub fn has_inline_data(&self) -> bool {
        self.i_flags & INLINE_DATA_FL != 0
    }

    /// Allocated space in 512-byte sectors.
    ///
    /// With `HUGE_FILE_FL` the on-disk count is in filesystem blocks.
    pub fn sectors(&self, block_size: usize) -> u64 {
        if self.i_flags & HUGE_FILE_FL != 0 {
            self.i_blocks.saturating_mul(block_size as u64 / SECTOR_SIZE)
        } else {
            self.i_blocks
        }
    }

    /// A symlink whose target lives in `i_block` instead of a data block.
    ///
    /// An extended attribute block is charged to `i_blocks` too, so it is
    /// discounted before checking that no data block is owned.
    pub fn is_fast_symlink(&self, block_size: usize) -> bool {
        if !self.is_symlink() || self.i_size > I_BLOCK_SIZE as u64 {
            return false;
        }
        if self.has_inline_data() {
            return true;
        }
        let xattr_sectors = if self.i_file_acl != 0 {
            block_size as u64 / SECTOR_SIZE
        } else {
            0
        };
        self.sectors(block_size).saturating_sub(xattr_sectors) == 0
    }
}
