use super::{
    combine_lo_hi, read_array, read_u16_le, read_u32_le, read_u64_le, trim_nul, write_u16_le,
    write_u32_le, write_u64_le,
};
use crate::error::{Ext4Error, Result};

// ─── Constants ──────────────────────────────────────────────────────────────

/// ext2/3/4 super block magic number (at offset 0x38).
pub const EXT4_SUPER_MAGIC: u16 = 0xEF53;

/// Super block is always at byte offset 1024 from start of device.
pub const SUPER_BLOCK_OFFSET: u64 = 1024;

/// Super block raw size is always 1024 bytes.
pub const SUPER_BLOCK_SIZE: usize = 1024;

/// `s_rev_level` of the first ext2 layout (fixed 128-byte inodes).
pub const GOOD_OLD_REV: u32 = 0;

/// `s_rev_level` with dynamic inode sizes and feature flags.
pub const DYNAMIC_REV: u32 = 1;

/// Inode record size on revision 0 images.
pub const GOOD_OLD_INODE_SIZE: u16 = 128;

/// First non-reserved inode on revision 0 images.
pub const GOOD_OLD_FIRST_INO: u32 = 11;

/// Largest supported `s_log_block_size` (64 KiB blocks).
pub const MAX_LOG_BLOCK_SIZE: u32 = 6;

// ─── Compatible feature flags ───────────────────────────────────────────────

pub const COMPAT_DIR_PREALLOC: u32 = 0x0001;
pub const COMPAT_IMAGIC_INODES: u32 = 0x0002;
pub const COMPAT_HAS_JOURNAL: u32 = 0x0004;
pub const COMPAT_EXT_ATTR: u32 = 0x0008;
pub const COMPAT_RESIZE_INODE: u32 = 0x0010;
pub const COMPAT_DIR_INDEX: u32 = 0x0020;
pub const COMPAT_SPARSE_SUPER2: u32 = 0x0200;

// ─── Incompatible feature flags ─────────────────────────────────────────────

pub const INCOMPAT_COMPRESSION: u32 = 0x0001;
pub const INCOMPAT_FILETYPE: u32 = 0x0002;
pub const INCOMPAT_RECOVER: u32 = 0x0004;
pub const INCOMPAT_JOURNAL_DEV: u32 = 0x0008;
pub const INCOMPAT_META_BG: u32 = 0x0010;
pub const INCOMPAT_EXTENTS: u32 = 0x0040;
pub const INCOMPAT_64BIT: u32 = 0x0080;
pub const INCOMPAT_MMP: u32 = 0x0100;
pub const INCOMPAT_FLEX_BG: u32 = 0x0200;
pub const INCOMPAT_EA_INODE: u32 = 0x0400;
pub const INCOMPAT_DIRDATA: u32 = 0x1000;
pub const INCOMPAT_CSUM_SEED: u32 = 0x2000;
pub const INCOMPAT_LARGEDIR: u32 = 0x4000;
pub const INCOMPAT_INLINE_DATA: u32 = 0x8000;
pub const INCOMPAT_ENCRYPT: u32 = 0x10000;

/// All incompat features we recognize.
const KNOWN_INCOMPAT: u32 = INCOMPAT_COMPRESSION
    | INCOMPAT_FILETYPE
    | INCOMPAT_RECOVER
    | INCOMPAT_JOURNAL_DEV
    | INCOMPAT_META_BG
    | INCOMPAT_EXTENTS
    | INCOMPAT_64BIT
    | INCOMPAT_MMP
    | INCOMPAT_FLEX_BG
    | INCOMPAT_EA_INODE
    | INCOMPAT_DIRDATA
    | INCOMPAT_CSUM_SEED
    | INCOMPAT_LARGEDIR
    | INCOMPAT_INLINE_DATA
    | INCOMPAT_ENCRYPT;

// ─── Read-only compatible feature flags ─────────────────────────────────────

pub const RO_COMPAT_SPARSE_SUPER: u32 = 0x0001;
pub const RO_COMPAT_LARGE_FILE: u32 = 0x0002;
pub const RO_COMPAT_BTREE_DIR: u32 = 0x0004;
pub const RO_COMPAT_HUGE_FILE: u32 = 0x0008;
pub const RO_COMPAT_GDT_CSUM: u32 = 0x0010;
pub const RO_COMPAT_DIR_NLINK: u32 = 0x0020;
pub const RO_COMPAT_EXTRA_ISIZE: u32 = 0x0040;
pub const RO_COMPAT_QUOTA: u32 = 0x0100;
pub const RO_COMPAT_BIGALLOC: u32 = 0x0200;
pub const RO_COMPAT_METADATA_CSUM: u32 = 0x0400;
pub const RO_COMPAT_READONLY: u32 = 0x1000;
pub const RO_COMPAT_PROJECT: u32 = 0x2000;

/// All ro_compat features we recognize.
const KNOWN_RO_COMPAT: u32 = RO_COMPAT_SPARSE_SUPER
    | RO_COMPAT_LARGE_FILE
    | RO_COMPAT_BTREE_DIR
    | RO_COMPAT_HUGE_FILE
    | RO_COMPAT_GDT_CSUM
    | RO_COMPAT_DIR_NLINK
    | RO_COMPAT_EXTRA_ISIZE
    | RO_COMPAT_QUOTA
    | RO_COMPAT_BIGALLOC
    | RO_COMPAT_METADATA_CSUM
    | RO_COMPAT_READONLY
    | RO_COMPAT_PROJECT;

// ─── Field offsets ──────────────────────────────────────────────────────────

const OFF_RESERVED: usize = 0x274;
const OFF_CHECKSUM: usize = 0x3FC;
const RESERVED_LEN: usize = OFF_CHECKSUM - OFF_RESERVED;

// SuperBlock struct

/// Parsed ext2/3/4 super block.
///
/// Every fixed-offset field of the 1024-byte record is kept so that
/// [`SuperBlock::to_bytes`] reproduces the record exactly. Fields that only
/// mean something under a given revision or feature are still decoded; the
/// accessors below apply the gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    // basic counts
    pub s_inodes_count: u32,
    pub s_blocks_count_lo: u32,
    pub s_r_blocks_count_lo: u32,
    pub s_free_blocks_count_lo: u32,
    pub s_free_inodes_count: u32,

    // geometry
    pub s_first_data_block: u32,
    pub s_log_block_size: u32,
    pub s_log_cluster_size: u32,
    pub s_blocks_per_group: u32,
    pub s_clusters_per_group: u32,
    pub s_inodes_per_group: u32,

    // mount bookkeeping
    pub s_mtime: u32,
    pub s_wtime: u32,
    pub s_mnt_count: u16,
    pub s_max_mnt_count: u16,
    pub s_magic: u16,
    pub s_state: u16,
    pub s_errors: u16,
    pub s_minor_rev_level: u16,
    pub s_lastcheck: u32,
    pub s_checkinterval: u32,
    pub s_creator_os: u32,
    pub s_rev_level: u32,
    pub s_def_resuid: u16,
    pub s_def_resgid: u16,

    // DYNAMIC_REV only
    pub s_first_ino: u32,
    pub s_inode_size: u16,
    pub s_block_group_nr: u16,
    pub s_feature_compat: u32,
    pub s_feature_incompat: u32,
    pub s_feature_ro_compat: u32,
    pub s_uuid: [u8; 16],
    pub s_volume_name: [u8; 16],
    pub s_last_mounted: [u8; 64],
    pub s_algorithm_usage_bitmap: u32,

    // performance hints
    pub s_prealloc_blocks: u8,
    pub s_prealloc_dir_blocks: u8,
    pub s_reserved_gdt_blocks: u16,

    // journaling
    pub s_journal_uuid: [u8; 16],
    pub s_journal_inum: u32,
    pub s_journal_dev: u32,
    pub s_last_orphan: u32,
    pub s_hash_seed: [u32; 4],
    pub s_def_hash_version: u8,
    pub s_jnl_backup_type: u8,
    pub s_desc_size: u16,
    pub s_default_mount_opts: u32,
    pub s_first_meta_bg: u32,
    pub s_mkfs_time: u32,
    pub s_jnl_blocks: [u32; 17],

    // 64BIT high halves
    pub s_blocks_count_hi: u32,
    pub s_r_blocks_count_hi: u32,
    pub s_free_blocks_count_hi: u32,
    pub s_min_extra_isize: u16,
    pub s_want_extra_isize: u16,
    pub s_flags: u32,
    pub s_raid_stride: u16,
    pub s_mmp_update_interval: u16,
    pub s_mmp_block: u64,
    pub s_raid_stripe_width: u32,
    pub s_log_groups_per_flex: u8,
    pub s_checksum_type: u8,
    pub s_encryption_level: u8,
    pub s_reserved_pad: u8,
    pub s_kbytes_written: u64,

    // snapshots
    pub s_snapshot_inum: u32,
    pub s_snapshot_id: u32,
    pub s_snapshot_r_blocks_count: u64,
    pub s_snapshot_list: u32,

    // error tracking
    pub s_error_count: u32,
    pub s_first_error_time: u32,
    pub s_first_error_ino: u32,
    pub s_first_error_block: u64,
    pub s_first_error_func: [u8; 32],
    pub s_first_error_line: u32,
    pub s_last_error_time: u32,
    pub s_last_error_ino: u32,
    pub s_last_error_line: u32,
    pub s_last_error_block: u64,
    pub s_last_error_func: [u8; 32],
    pub s_mount_opts: [u8; 64],

    // quota / misc
    pub s_usr_quota_inum: u32,
    pub s_grp_quota_inum: u32,
    pub s_overhead_clusters: u32,
    pub s_backup_bgs: [u32; 2],
    pub s_encrypt_algos: [u8; 4],
    pub s_encrypt_pw_salt: [u8; 16],
    pub s_lpf_ino: u32,
    pub s_prj_quota_inum: u32,
    pub s_checksum_seed: u32,
    /// Bytes 0x274..0x3FC, carried verbatim.
    pub s_reserved: [u8; RESERVED_LEN],
    pub s_checksum: u32,
}

impl SuperBlock {
    /// Parse a super block from raw 1024-byte on-disk data.
    ///
    /// Only the magic is checked here; geometry is checked by [`validate`].
    ///
    /// [`validate`]: SuperBlock::validate
    pub fn parse(raw: &[u8; SUPER_BLOCK_SIZE]) -> Result<SuperBlock> {
        let magic = read_u16_le(raw, 0x38);
        if magic != EXT4_SUPER_MAGIC {
            return Err(Ext4Error::InvalidMagic { found: magic });
        }

        let mut s_hash_seed = [0u32; 4];
        for (i, seed) in s_hash_seed.iter_mut().enumerate() {
            *seed = read_u32_le(raw, 0xEC + i * 4);
        }
        let mut s_jnl_blocks = [0u32; 17];
        for (i, block) in s_jnl_blocks.iter_mut().enumerate() {
            *block = read_u32_le(raw, 0x10C + i * 4);
        }

        Ok(SuperBlock {
            s_inodes_count: read_u32_le(raw, 0x00),
            s_blocks_count_lo: read_u32_le(raw, 0x04),
            s_r_blocks_count_lo: read_u32_le(raw, 0x08),
            s_free_blocks_count_lo: read_u32_le(raw, 0x0C),
            s_free_inodes_count: read_u32_le(raw, 0x10),
            s_first_data_block: read_u32_le(raw, 0x14),
            s_log_block_size: read_u32_le(raw, 0x18),
            s_log_cluster_size: read_u32_le(raw, 0x1C),
            s_blocks_per_group: read_u32_le(raw, 0x20),
            s_clusters_per_group: read_u32_le(raw, 0x24),
            s_inodes_per_group: read_u32_le(raw, 0x28),
            s_mtime: read_u32_le(raw, 0x2C),
            s_wtime: read_u32_le(raw, 0x30),
            s_mnt_count: read_u16_le(raw, 0x34),
            s_max_mnt_count: read_u16_le(raw, 0x36),
            s_magic: magic,
            s_state: read_u16_le(raw, 0x3A),
            s_errors: read_u16_le(raw, 0x3C),
            s_minor_rev_level: read_u16_le(raw, 0x3E),
            s_lastcheck: read_u32_le(raw, 0x40),
            s_checkinterval: read_u32_le(raw, 0x44),
            s_creator_os: read_u32_le(raw, 0x48),
            s_rev_level: read_u32_le(raw, 0x4C),
            s_def_resuid: read_u16_le(raw, 0x50),
            s_def_resgid: read_u16_le(raw, 0x52),
            s_first_ino: read_u32_le(raw, 0x54),
            s_inode_size: read_u16_le(raw, 0x58),
            s_block_group_nr: read_u16_le(raw, 0x5A),
            s_feature_compat: read_u32_le(raw, 0x5C),
            s_feature_incompat: read_u32_le(raw, 0x60),
            s_feature_ro_compat: read_u32_le(raw, 0x64),
            s_uuid: read_array(raw, 0x68),
            s_volume_name: read_array(raw, 0x78),
            s_last_mounted: read_array(raw, 0x88),
            s_algorithm_usage_bitmap: read_u32_le(raw, 0xC8),
            s_prealloc_blocks: raw[0xCC],
            s_prealloc_dir_blocks: raw[0xCD],
            s_reserved_gdt_blocks: read_u16_le(raw, 0xCE),
            s_journal_uuid: read_array(raw, 0xD0),
            s_journal_inum: read_u32_le(raw, 0xE0),
            s_journal_dev: read_u32_le(raw, 0xE4),
            s_last_orphan: read_u32_le(raw, 0xE8),
            s_hash_seed,
            s_def_hash_version: raw[0xFC],
            s_jnl_backup_type: raw[0xFD],
            s_desc_size: read_u16_le(raw, 0xFE),
            s_default_mount_opts: read_u32_le(raw, 0x100),
            s_first_meta_bg: read_u32_le(raw, 0x104),
            s_mkfs_time: read_u32_le(raw, 0x108),
            s_jnl_blocks,
            s_blocks_count_hi: read_u32_le(raw, 0x150),
            s_r_blocks_count_hi: read_u32_le(raw, 0x154),
            s_free_blocks_count_hi: read_u32_le(raw, 0x158),
            s_min_extra_isize: read_u16_le(raw, 0x15C),
            s_want_extra_isize: read_u16_le(raw, 0x15E),
            s_flags: read_u32_le(raw, 0x160),
            s_raid_stride: read_u16_le(raw, 0x164),
            s_mmp_update_interval: read_u16_le(raw, 0x166),
            s_mmp_block: read_u64_le(raw, 0x168),
            s_raid_stripe_width: read_u32_le(raw, 0x170),
            s_log_groups_per_flex: raw[0x174],
            s_checksum_type: raw[0x175],
            s_encryption_level: raw[0x176],
            s_reserved_pad: raw[0x177],
            s_kbytes_written: read_u64_le(raw, 0x178),
            s_snapshot_inum: read_u32_le(raw, 0x180),
            s_snapshot_id: read_u32_le(raw, 0x184),
            s_snapshot_r_blocks_count: read_u64_le(raw, 0x188),
            s_snapshot_list: read_u32_le(raw, 0x190),
            s_error_count: read_u32_le(raw, 0x194),
            s_first_error_time: read_u32_le(raw, 0x198),
            s_first_error_ino: read_u32_le(raw, 0x19C),
            s_first_error_block: read_u64_le(raw, 0x1A0),
            s_first_error_func: read_array(raw, 0x1A8),
            s_first_error_line: read_u32_le(raw, 0x1C8),
            s_last_error_time: read_u32_le(raw, 0x1CC),
            s_last_error_ino: read_u32_le(raw, 0x1D0),
            s_last_error_line: read_u32_le(raw, 0x1D4),
            s_last_error_block: read_u64_le(raw, 0x1D8),
            s_last_error_func: read_array(raw, 0x1E0),
            s_mount_opts: read_array(raw, 0x200),
            s_usr_quota_inum: read_u32_le(raw, 0x240),
            s_grp_quota_inum: read_u32_le(raw, 0x244),
            s_overhead_clusters: read_u32_le(raw, 0x248),
            s_backup_bgs: [read_u32_le(raw, 0x24C), read_u32_le(raw, 0x250)],
            s_encrypt_algos: read_array(raw, 0x254),
            s_encrypt_pw_salt: read_array(raw, 0x258),
            s_lpf_ino: read_u32_le(raw, 0x268),
            s_prj_quota_inum: read_u32_le(raw, 0x26C),
            s_checksum_seed: read_u32_le(raw, 0x270),
            s_reserved: read_array(raw, OFF_RESERVED),
            s_checksum: read_u32_le(raw, OFF_CHECKSUM),
        })
    }

    /// Encode back into the 1024-byte on-disk record.
    pub fn to_bytes(&self) -> [u8; SUPER_BLOCK_SIZE] {
        let mut raw = [0u8; SUPER_BLOCK_SIZE];

        write_u32_le(&mut raw, 0x00, self.s_inodes_count);
        write_u32_le(&mut raw, 0x04, self.s_blocks_count_lo);
        write_u32_le(&mut raw, 0x08, self.s_r_blocks_count_lo);
        write_u32_le(&mut raw, 0x0C, self.s_free_blocks_count_lo);
        write_u32_le(&mut raw, 0x10, self.s_free_inodes_count);
        write_u32_le(&mut raw, 0x14, self.s_first_data_block);
        write_u32_le(&mut raw, 0x18, self.s_log_block_size);
        write_u32_le(&mut raw, 0x1C, self.s_log_cluster_size);
        write_u32_le(&mut raw, 0x20, self.s_blocks_per_group);
        write_u32_le(&mut raw, 0x24, self.s_clusters_per_group);
        write_u32_le(&mut raw, 0x28, self.s_inodes_per_group);
        write_u32_le(&mut raw, 0x2C, self.s_mtime);
        write_u32_le(&mut raw, 0x30, self.s_wtime);
        write_u16_le(&mut raw, 0x34, self.s_mnt_count);
        write_u16_le(&mut raw, 0x36, self.s_max_mnt_count);
        write_u16_le(&mut raw, 0x38, self.s_magic);
        write_u16_le(&mut raw, 0x3A, self.s_state);
        write_u16_le(&mut raw, 0x3C, self.s_errors);
        write_u16_le(&mut raw, 0x3E, self.s_minor_rev_level);
        write_u32_le(&mut raw, 0x40, self.s_lastcheck);
        write_u32_le(&mut raw, 0x44, self.s_checkinterval);
        write_u32_le(&mut raw, 0x48, self.s_creator_os);
        write_u32_le(&mut raw, 0x4C, self.s_rev_level);
        write_u16_le(&mut raw, 0x50, self.s_def_resuid);
        write_u16_le(&mut raw, 0x52, self.s_def_resgid);
        write_u32_le(&mut raw, 0x54, self.s_first_ino);
        write_u16_le(&mut raw, 0x58, self.s_inode_size);
        write_u16_le(&mut raw, 0x5A, self.s_block_group_nr);
        write_u32_le(&mut raw, 0x5C, self.s_feature_compat);
        write_u32_le(&mut raw, 0x60, self.s_feature_incompat);
        write_u32_le(&mut raw, 0x64, self.s_feature_ro_compat);
        raw[0x68..0x78].copy_from_slice(&self.s_uuid);
        raw[0x78..0x88].copy_from_slice(&self.s_volume_name);
        raw[0x88..0xC8].copy_from_slice(&self.s_last_mounted);
        write_u32_le(&mut raw, 0xC8, self.s_algorithm_usage_bitmap);
        raw[0xCC] = self.s_prealloc_blocks;
        raw[0xCD] = self.s_prealloc_dir_blocks;
        write_u16_le(&mut raw, 0xCE, self.s_reserved_gdt_blocks);
        raw[0xD0..0xE0].copy_from_slice(&self.s_journal_uuid);
        write_u32_le(&mut raw, 0xE0, self.s_journal_inum);
        write_u32_le(&mut raw, 0xE4, self.s_journal_dev);
        write_u32_le(&mut raw, 0xE8, self.s_last_orphan);
        for (i, seed) in self.s_hash_seed.iter().enumerate() {
            write_u32_le(&mut raw, 0xEC + i * 4, *seed);
        }
        raw[0xFC] = self.s_def_hash_version;
        raw[0xFD] = self.s_jnl_backup_type;
        write_u16_le(&mut raw, 0xFE, self.s_desc_size);
        write_u32_le(&mut raw, 0x100, self.s_default_mount_opts);
        write_u32_le(&mut raw, 0x104, self.s_first_meta_bg);
        write_u32_le(&mut raw, 0x108, self.s_mkfs_time);
        for (i, block) in self.s_jnl_blocks.iter().enumerate() {
            write_u32_le(&mut raw, 0x10C + i * 4, *block);
        }
        write_u32_le(&mut raw, 0x150, self.s_blocks_count_hi);
        write_u32_le(&mut raw, 0x154, self.s_r_blocks_count_hi);
        write_u32_le(&mut raw, 0x158, self.s_free_blocks_count_hi);
        write_u16_le(&mut raw, 0x15C, self.s_min_extra_isize);
        write_u16_le(&mut raw, 0x15E, self.s_want_extra_isize);
        write_u32_le(&mut raw, 0x160, self.s_flags);
        write_u16_le(&mut raw, 0x164, self.s_raid_stride);
        write_u16_le(&mut raw, 0x166, self.s_mmp_update_interval);
        write_u64_le(&mut raw, 0x168, self.s_mmp_block);
        write_u32_le(&mut raw, 0x170, self.s_raid_stripe_width);
        raw[0x174] = self.s_log_groups_per_flex;
        raw[0x175] = self.s_checksum_type;
        raw[0x176] = self.s_encryption_level;
        raw[0x177] = self.s_reserved_pad;
        write_u64_le(&mut raw, 0x178, self.s_kbytes_written);
        write_u32_le(&mut raw, 0x180, self.s_snapshot_inum);
        write_u32_le(&mut raw, 0x184, self.s_snapshot_id);
        write_u64_le(&mut raw, 0x188, self.s_snapshot_r_blocks_count);
        write_u32_le(&mut raw, 0x190, self.s_snapshot_list);
        write_u32_le(&mut raw, 0x194, self.s_error_count);
        write_u32_le(&mut raw, 0x198, self.s_first_error_time);
        write_u32_le(&mut raw, 0x19C, self.s_first_error_ino);
        write_u64_le(&mut raw, 0x1A0, self.s_first_error_block);
        raw[0x1A8..0x1C8].copy_from_slice(&self.s_first_error_func);
        write_u32_le(&mut raw, 0x1C8, self.s_first_error_line);
        write_u32_le(&mut raw, 0x1CC, self.s_last_error_time);
        write_u32_le(&mut raw, 0x1D0, self.s_last_error_ino);
        write_u32_le(&mut raw, 0x1D4, self.s_last_error_line);
        write_u64_le(&mut raw, 0x1D8, self.s_last_error_block);
        raw[0x1E0..0x200].copy_from_slice(&self.s_last_error_func);
        raw[0x200..0x240].copy_from_slice(&self.s_mount_opts);
        write_u32_le(&mut raw, 0x240, self.s_usr_quota_inum);
        write_u32_le(&mut raw, 0x244, self.s_grp_quota_inum);
        write_u32_le(&mut raw, 0x248, self.s_overhead_clusters);
        write_u32_le(&mut raw, 0x24C, self.s_backup_bgs[0]);
        write_u32_le(&mut raw, 0x250, self.s_backup_bgs[1]);
        raw[0x254..0x258].copy_from_slice(&self.s_encrypt_algos);
        raw[0x258..0x268].copy_from_slice(&self.s_encrypt_pw_salt);
        write_u32_le(&mut raw, 0x268, self.s_lpf_ino);
        write_u32_le(&mut raw, 0x26C, self.s_prj_quota_inum);
        write_u32_le(&mut raw, 0x270, self.s_checksum_seed);
        raw[OFF_RESERVED..OFF_CHECKSUM].copy_from_slice(&self.s_reserved);
        write_u32_le(&mut raw, OFF_CHECKSUM, self.s_checksum);

        raw
    }

    /// Validate geometry and the block/inode group-count invariant.
    pub fn validate(&self) -> Result<()> {
        if self.s_magic != EXT4_SUPER_MAGIC {
            return Err(Ext4Error::InvalidMagic {
                found: self.s_magic,
            });
        }

        // log_block_size: 0 → 1 KiB, 6 → 64 KiB
        if self.s_log_block_size > MAX_LOG_BLOCK_SIZE {
            return Err(Ext4Error::corrupted("invalid log_block_size (> 6)"));
        }

        if self.s_inodes_per_group == 0 {
            return Err(Ext4Error::corrupted("inodes_per_group is zero"));
        }

        if self.s_blocks_per_group == 0 {
            return Err(Ext4Error::corrupted("blocks_per_group is zero"));
        }

        if self.s_rev_level >= DYNAMIC_REV {
            if self.s_inode_size < GOOD_OLD_INODE_SIZE {
                return Err(Ext4Error::corrupted("inode_size < 128"));
            }
            if !self.s_inode_size.is_power_of_two() {
                return Err(Ext4Error::corrupted("inode_size not power of two"));
            }
            if self.s_inode_size as usize > self.block_size() {
                return Err(Ext4Error::corrupted("inode_size larger than a block"));
            }
        }

        let by_blocks = self.group_count();
        let by_inodes = self.group_count_by_inodes();
        if by_blocks != by_inodes {
            return Err(Ext4Error::GroupCountMismatch {
                by_blocks,
                by_inodes,
            });
        }

        Ok(())
    }

    /// Check feature flags compatibility.
    ///
    /// Unknown incompat bits change the on-disk layout in ways this reader
    /// cannot know about, so they reject the image. Unknown ro_compat bits
    /// are harmless for a read-only reader and are returned for logging.
    pub fn check_features(&self) -> Result<u32> {
        let unknown_incompat = self.s_feature_incompat & !KNOWN_INCOMPAT;
        if unknown_incompat != 0 {
            return Err(Ext4Error::IncompatibleFeature(unknown_incompat));
        }
        Ok(self.s_feature_ro_compat & !KNOWN_RO_COMPAT)
    }

    // Convenience accessors

    /// Block size in bytes: `1024 << s_log_block_size`.
    pub fn block_size(&self) -> usize {
        1024usize << self.s_log_block_size
    }

    /// Total block count, `s_blocks_count_hi` joined only under 64BIT.
    pub fn block_count(&self) -> u64 {
        combine_lo_hi(
            self.s_blocks_count_lo,
            self.s_blocks_count_hi,
            self.has_64bit(),
        )
    }

    /// Reserved block count.
    pub fn reserved_block_count(&self) -> u64 {
        combine_lo_hi(
            self.s_r_blocks_count_lo,
            self.s_r_blocks_count_hi,
            self.has_64bit(),
        )
    }

    /// Total free block count.
    pub fn free_blocks_count(&self) -> u64 {
        combine_lo_hi(
            self.s_free_blocks_count_lo,
            self.s_free_blocks_count_hi,
            self.has_64bit(),
        )
    }

    /// Number of block groups: `ceil(block_count / blocks_per_group)`.
    pub fn group_count(&self) -> u64 {
        self.block_count()
            .div_ceil(self.s_blocks_per_group.max(1) as u64)
    }

    /// Number of block groups implied by the inode count.
    pub fn group_count_by_inodes(&self) -> u64 {
        (self.s_inodes_count as u64).div_ceil(self.s_inodes_per_group.max(1) as u64)
    }

    /// Inode record size; revision 0 images have no `s_inode_size` field.
    pub fn inode_size(&self) -> u16 {
        if self.s_rev_level == GOOD_OLD_REV {
            GOOD_OLD_INODE_SIZE
        } else {
            self.s_inode_size
        }
    }

    /// First non-reserved inode number.
    pub fn first_ino(&self) -> u32 {
        if self.s_rev_level == GOOD_OLD_REV {
            GOOD_OLD_FIRST_INO
        } else {
            self.s_first_ino
        }
    }

    /// Block group descriptor size (64 or more if 64-bit, else 32).
    pub fn desc_size(&self) -> usize {
        if self.has_64bit() {
            (self.s_desc_size as usize).max(64)
        } else {
            32
        }
    }

    /// Volume label, NUL padding removed.
    pub fn volume_name(&self) -> String {
        trim_nul(&self.s_volume_name)
    }

    /// Directory where the filesystem was last mounted.
    pub fn last_mounted(&self) -> String {
        trim_nul(&self.s_last_mounted)
    }

    // Feature predicates

    fn compat(&self, bit: u32) -> bool {
        self.s_feature_compat & bit != 0
    }

    fn incompat(&self, bit: u32) -> bool {
        self.s_feature_incompat & bit != 0
    }

    fn ro_compat(&self, bit: u32) -> bool {
        self.s_feature_ro_compat & bit != 0
    }

    pub fn has_dir_prealloc(&self) -> bool {
        self.compat(COMPAT_DIR_PREALLOC)
    }

    pub fn has_imagic_inodes(&self) -> bool {
        self.compat(COMPAT_IMAGIC_INODES)
    }

    pub fn has_journal(&self) -> bool {
        self.compat(COMPAT_HAS_JOURNAL)
    }

    pub fn has_ext_attr(&self) -> bool {
        self.compat(COMPAT_EXT_ATTR)
    }

    pub fn has_resize_inode(&self) -> bool {
        self.compat(COMPAT_RESIZE_INODE)
    }

    /// Whether directory indexing (HTree) is enabled.
    pub fn has_dir_index(&self) -> bool {
        self.compat(COMPAT_DIR_INDEX)
    }

    pub fn has_sparse_super2(&self) -> bool {
        self.compat(COMPAT_SPARSE_SUPER2)
    }

    pub fn has_compression(&self) -> bool {
        self.incompat(INCOMPAT_COMPRESSION)
    }

    /// Whether directory entries carry a file type byte.
    pub fn has_filetype(&self) -> bool {
        self.incompat(INCOMPAT_FILETYPE)
    }

    pub fn needs_recovery(&self) -> bool {
        self.incompat(INCOMPAT_RECOVER)
    }

    pub fn has_journal_dev(&self) -> bool {
        self.incompat(INCOMPAT_JOURNAL_DEV)
    }

    pub fn has_meta_bg(&self) -> bool {
        self.incompat(INCOMPAT_META_BG)
    }

    /// Whether the extents feature is enabled.
    pub fn has_extents(&self) -> bool {
        self.incompat(INCOMPAT_EXTENTS)
    }

    /// Whether the 64-bit feature is enabled.
    pub fn has_64bit(&self) -> bool {
        self.incompat(INCOMPAT_64BIT)
    }

    pub fn has_mmp(&self) -> bool {
        self.incompat(INCOMPAT_MMP)
    }

    pub fn has_flex_bg(&self) -> bool {
        self.incompat(INCOMPAT_FLEX_BG)
    }

    pub fn has_ea_inode(&self) -> bool {
        self.incompat(INCOMPAT_EA_INODE)
    }

    pub fn has_dirdata(&self) -> bool {
        self.incompat(INCOMPAT_DIRDATA)
    }

    pub fn has_csum_seed(&self) -> bool {
        self.incompat(INCOMPAT_CSUM_SEED)
    }

    pub fn has_largedir(&self) -> bool {
        self.incompat(INCOMPAT_LARGEDIR)
    }

    pub fn has_inline_data(&self) -> bool {
        self.incompat(INCOMPAT_INLINE_DATA)
    }

    pub fn has_encrypt(&self) -> bool {
        self.incompat(INCOMPAT_ENCRYPT)
    }

    pub fn has_sparse_super(&self) -> bool {
        self.ro_compat(RO_COMPAT_SPARSE_SUPER)
    }

    /// Whether `i_size_high` extends file sizes past 4 GiB.
    pub fn has_large_file(&self) -> bool {
        self.ro_compat(RO_COMPAT_LARGE_FILE)
    }

    pub fn has_btree_dir(&self) -> bool {
        self.ro_compat(RO_COMPAT_BTREE_DIR)
    }

    pub fn has_huge_file(&self) -> bool {
        self.ro_compat(RO_COMPAT_HUGE_FILE)
    }

    pub fn has_gdt_csum(&self) -> bool {
        self.ro_compat(RO_COMPAT_GDT_CSUM)
    }

    pub fn has_dir_nlink(&self) -> bool {
        self.ro_compat(RO_COMPAT_DIR_NLINK)
    }

    pub fn has_extra_isize(&self) -> bool {
        self.ro_compat(RO_COMPAT_EXTRA_ISIZE)
    }

    pub fn has_quota(&self) -> bool {
        self.ro_compat(RO_COMPAT_QUOTA)
    }

    pub fn has_bigalloc(&self) -> bool {
        self.ro_compat(RO_COMPAT_BIGALLOC)
    }

    /// Whether metadata checksumming is enabled.
    pub fn has_metadata_csum(&self) -> bool {
        self.ro_compat(RO_COMPAT_METADATA_CSUM)
    }

    pub fn is_readonly(&self) -> bool {
        self.ro_compat(RO_COMPAT_READONLY)
    }

    pub fn has_project(&self) -> bool {
        self.ro_compat(RO_COMPAT_PROJECT)
    }
}
