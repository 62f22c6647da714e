//! End-to-end tests over synthetic images built in memory.
//!
//! Layout of the standard image (1 KiB blocks, 128 blocks, one group):
//!
//! | block | content                         |
//! |-------|---------------------------------|
//! | 1     | super block                     |
//! | 2     | group descriptor table          |
//! | 3, 4  | block / inode bitmaps (unused)  |
//! | 5..=8 | inode table, 32 x 128 bytes     |
//! | 9..   | data blocks, allocated in order |

use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::config::OpenOptions;
use crate::error::{ErrorKind, Ext4Error};
use crate::fs::Ext4FileSystem;
use crate::fs_core::block_mapper::BlockMapper;
use crate::fs_core::dir_reader::DirReader;
use crate::fs_core::group_resolver::GroupResolver;
use crate::fs_core::inode_reader::InodeReader;
use crate::fs_core::superblock_manager::SuperBlockManager;
use crate::io::block_reader::BlockReader;
use crate::layout::extent::EXTENT_HEADER_MAGIC;
use crate::layout::inode::{EXTENTS_FL, I_BLOCK_SIZE, INDEX_FL, S_IFDIR, S_IFLNK, S_IFREG};
use crate::layout::superblock::{
    DYNAMIC_REV, EXT4_SUPER_MAGIC, INCOMPAT_64BIT, INCOMPAT_EXTENTS, INCOMPAT_FILETYPE,
    RO_COMPAT_LARGE_FILE, SuperBlock,
};
use crate::layout::{write_u16_le, write_u32_le};
use crate::traits::vfs::{FileSystem, InodeOps};

const BLOCK_SIZE: usize = 1024;
const BLOCKS: u32 = 128;
const INODES_PER_GROUP: u32 = 32;
const INODE_TABLE: u64 = 5;
const FIRST_DATA: u64 = 9;

const ROOT: u32 = 2;
const HELLO: u32 = 12;
const SUB: u32 = 13;
const LINK: u32 = 14;
const DEEP: u32 = 15;
const SPARSE: u32 = 16;
const BROKEN: u32 = 17;
const LONG_LINK: u32 = 18;

const FT_REG: u8 = 1;
const FT_DIR: u8 = 2;
const FT_SYMLINK: u8 = 7;

/// Raw super block for a 1 KiB-block image with the given geometry.
pub(crate) fn raw_super_block(
    blocks: u32,
    inodes: u32,
    blocks_per_group: u32,
    inodes_per_group: u32,
) -> [u8; 1024] {
    let mut raw = [0u8; 1024];
    write_u32_le(&mut raw, 0x00, inodes);
    write_u32_le(&mut raw, 0x04, blocks);
    write_u32_le(&mut raw, 0x0C, blocks / 2);
    write_u32_le(&mut raw, 0x10, inodes - 18);
    write_u32_le(&mut raw, 0x14, 1);
    write_u32_le(&mut raw, 0x20, blocks_per_group);
    write_u32_le(&mut raw, 0x24, blocks_per_group);
    write_u32_le(&mut raw, 0x28, inodes_per_group);
    write_u16_le(&mut raw, 0x38, EXT4_SUPER_MAGIC);
    write_u32_le(&mut raw, 0x4C, DYNAMIC_REV);
    write_u32_le(&mut raw, 0x54, 11);
    write_u16_le(&mut raw, 0x58, 128);
    write_u32_le(&mut raw, 0x60, INCOMPAT_FILETYPE | INCOMPAT_EXTENTS);
    write_u32_le(&mut raw, 0x64, RO_COMPAT_LARGE_FILE);
    raw[0x78..0x7E].copy_from_slice(b"synth\0");
    raw
}

fn rec_len_for(name: &[u8]) -> usize {
    (8 + name.len()).next_multiple_of(4)
}

/// Builds an image byte by byte.
struct ImageBuilder {
    image: Vec<u8>,
    next_block: u64,
}

impl ImageBuilder {
    fn new() -> Self {
        Self::with_groups(1)
    }

    /// `groups` groups of `BLOCKS` blocks and `INODES_PER_GROUP` inodes.
    /// Only group 0's descriptor is filled in.
    fn with_groups(groups: u32) -> Self {
        let blocks = groups * BLOCKS;
        let mut image = vec![0u8; blocks as usize * BLOCK_SIZE];
        let sb = raw_super_block(blocks, groups * INODES_PER_GROUP, BLOCKS, INODES_PER_GROUP);
        image[1024..2048].copy_from_slice(&sb);

        let gdt = 2 * BLOCK_SIZE;
        write_u32_le(&mut image, gdt, 3);
        write_u32_le(&mut image, gdt + 0x04, 4);
        write_u32_le(&mut image, gdt + 0x08, INODE_TABLE as u32);

        ImageBuilder {
            image,
            next_block: FIRST_DATA,
        }
    }

    fn block_mut(&mut self, block: u64) -> &mut [u8] {
        let start = block as usize * BLOCK_SIZE;
        &mut self.image[start..start + BLOCK_SIZE]
    }

    fn alloc_block(&mut self, data: &[u8]) -> u64 {
        let block = self.next_block;
        self.next_block += 1;
        self.block_mut(block)[..data.len()].copy_from_slice(data);
        block
    }

    fn inode_offset(ino: u32) -> usize {
        INODE_TABLE as usize * BLOCK_SIZE + (ino as usize - 1) * 128
    }

    fn put_inode(&mut self, ino: u32, mode: u16, size: u64, flags: u32, i_block: [u8; I_BLOCK_SIZE]) {
        self.put_inode_at(Self::inode_offset(ino), mode, size, flags, i_block);
    }

    /// Write a 128-byte inode record at an absolute byte offset.
    fn put_inode_at(&mut self, off: usize, mode: u16, size: u64, flags: u32, i_block: [u8; I_BLOCK_SIZE]) {
        let raw = &mut self.image[off..off + 128];
        raw.fill(0);
        write_u16_le(raw, 0x00, mode);
        write_u32_le(raw, 0x04, size as u32);
        write_u16_le(raw, 0x1A, 1);
        let sectors = size.div_ceil(BLOCK_SIZE as u64) as u32 * 2;
        let is_fast_link = mode & 0xF000 == S_IFLNK && size <= I_BLOCK_SIZE as u64;
        write_u32_le(raw, 0x1C, if is_fast_link { 0 } else { sectors });
        write_u32_le(raw, 0x20, flags);
        raw[0x28..0x64].copy_from_slice(&i_block);
        write_u32_le(raw, 0x6C, (size >> 32) as u32);
    }

    fn set_flags(&mut self, ino: u32, flags: u32) {
        let off = Self::inode_offset(ino);
        write_u32_le(&mut self.image, off + 0x20, flags);
    }

    /// Fill one directory block; the last record absorbs the rest.
    fn dir_block(entries: &[(u32, &[u8], u8)]) -> Vec<u8> {
        let mut block = vec![0u8; BLOCK_SIZE];
        let mut off = 0;
        for (i, (ino, name, ft)) in entries.iter().enumerate() {
            let rec_len = if i + 1 == entries.len() {
                BLOCK_SIZE - off
            } else {
                rec_len_for(name)
            };
            write_u32_le(&mut block, off, *ino);
            write_u16_le(&mut block, off + 4, rec_len as u16);
            block[off + 6] = name.len() as u8;
            block[off + 7] = *ft;
            block[off + 8..off + 8 + name.len()].copy_from_slice(name);
            off += rec_len;
        }
        block
    }

    fn build(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.image)
    }
}

/// Extent root for `i_block`: `(logical, len, physical)` leaf entries.
fn extent_payload(extents: &[(u32, u16, u64)]) -> [u8; I_BLOCK_SIZE] {
    let mut raw = [0u8; I_BLOCK_SIZE];
    write_u16_le(&mut raw, 0, EXTENT_HEADER_MAGIC);
    write_u16_le(&mut raw, 2, extents.len() as u16);
    write_u16_le(&mut raw, 4, 4);
    for (i, (logical, len, physical)) in extents.iter().enumerate() {
        let off = 12 + i * 12;
        write_u32_le(&mut raw, off, *logical);
        write_u16_le(&mut raw, off + 4, *len);
        write_u16_le(&mut raw, off + 6, (*physical >> 32) as u16);
        write_u32_le(&mut raw, off + 8, *physical as u32);
    }
    raw
}

fn direct_payload(pointers: &[u32]) -> [u8; I_BLOCK_SIZE] {
    let mut raw = [0u8; I_BLOCK_SIZE];
    for (i, ptr) in pointers.iter().enumerate() {
        write_u32_le(&mut raw, i * 4, *ptr);
    }
    raw
}

fn hello_content() -> Vec<u8> {
    (0..1500u32).map(|i| (i % 251) as u8).collect()
}

fn long_target() -> String {
    format!("/sub/{}", "x".repeat(70))
}

/// The standard tree:
///
/// ```text
/// /             extent dir
/// /hello.txt    1500 bytes over two extent blocks
/// /link         fast symlink -> hello.txt
/// /long         slow symlink, 75-byte target
/// /broken       size 3000, one mapped block
/// /sub          classic-map dir
/// /sub/deep.txt "deep!"
/// /sub/sparse   2048 bytes, first block a hole
/// ```
fn standard_image() -> ImageBuilder {
    let mut b = ImageBuilder::new();

    let root_block = b.alloc_block(&ImageBuilder::dir_block(&[
        (ROOT, b".", FT_DIR),
        (ROOT, b"..", FT_DIR),
        (HELLO, b"hello.txt", FT_REG),
        (0, b"gone", FT_REG),
        (SUB, b"sub", FT_DIR),
        (LINK, b"link", FT_SYMLINK),
        (LONG_LINK, b"long", FT_SYMLINK),
        (BROKEN, b"broken", FT_REG),
    ]));
    b.put_inode(
        ROOT,
        S_IFDIR | 0o755,
        BLOCK_SIZE as u64,
        EXTENTS_FL,
        extent_payload(&[(0, 1, root_block)]),
    );

    let content = hello_content();
    let first = b.alloc_block(&content[..BLOCK_SIZE]);
    b.alloc_block(&content[BLOCK_SIZE..]);
    b.put_inode(
        HELLO,
        S_IFREG | 0o644,
        content.len() as u64,
        EXTENTS_FL,
        extent_payload(&[(0, 2, first)]),
    );

    let sub_block = b.alloc_block(&ImageBuilder::dir_block(&[
        (SUB, b".", FT_DIR),
        (ROOT, b"..", FT_DIR),
        (DEEP, b"deep.txt", FT_REG),
        (SPARSE, b"sparse", FT_REG),
    ]));
    b.put_inode(
        SUB,
        S_IFDIR | 0o755,
        BLOCK_SIZE as u64,
        0,
        direct_payload(&[sub_block as u32]),
    );

    let deep = b.alloc_block(b"deep!");
    b.put_inode(DEEP, S_IFREG | 0o644, 5, 0, direct_payload(&[deep as u32]));

    let tail = b.alloc_block(&[0xAB; BLOCK_SIZE]);
    b.put_inode(
        SPARSE,
        S_IFREG | 0o644,
        2 * BLOCK_SIZE as u64,
        0,
        direct_payload(&[0, tail as u32]),
    );

    let mut fast = [0u8; I_BLOCK_SIZE];
    fast[..9].copy_from_slice(b"hello.txt");
    b.put_inode(LINK, S_IFLNK | 0o777, 9, 0, fast);

    let target = long_target();
    let long = b.alloc_block(target.as_bytes());
    b.put_inode(
        LONG_LINK,
        S_IFLNK | 0o777,
        target.len() as u64,
        0,
        direct_payload(&[long as u32]),
    );

    let broken = b.alloc_block(&[0x11; BLOCK_SIZE]);
    b.put_inode(
        BROKEN,
        S_IFREG | 0o644,
        3000,
        EXTENTS_FL,
        extent_payload(&[(0, 1, broken)]),
    );

    b
}

fn open_standard() -> Ext4FileSystem<Cursor<Vec<u8>>> {
    Ext4FileSystem::open(standard_image().build()).unwrap()
}

fn names(entries: &[crate::layout::dir_entry::DirEntry]) -> Vec<String> {
    entries.iter().map(|e| e.name_lossy().into_owned()).collect()
}

#[test]
fn test_open_small_image_has_one_group() {
    let fs = open_standard();
    assert_eq!(fs.sb_manager.block_size, 1024);
    assert_eq!(fs.sb_manager.group_count, 1);
    assert_eq!(fs.super_block().block_count(), 128);

    let stat = fs.stat_fs().unwrap();
    assert_eq!(stat.total_blocks, 128);
    assert_eq!(stat.total_inodes, 32);
    assert_eq!(stat.group_count, 1);
    assert_eq!(stat.volume_name, "synth");
}

#[test]
fn test_root_block_holds_dot_entries_and_ends_on_boundary() {
    let fs = open_standard();
    let root = fs.root().unwrap();
    assert!(root.is_dir());
    assert!(root.uses_extents());

    let reader = BlockReader::new(standard_image().build());
    let entries = DirReader::read_entries(&reader, &fs.sb_manager, &root).unwrap();
    assert_eq!(entries[0].name, b".");
    assert_eq!(entries[0].inode, ROOT);
    assert_eq!(entries[1].name, b"..");
    assert_eq!(entries[1].inode, ROOT);

    let total: usize = entries.iter().map(|e| e.rec_len as usize).sum();
    assert_eq!(total, BLOCK_SIZE);
    // the unused record is enumerated here but not by read_dir
    assert!(entries.iter().any(|e| e.is_unused()));
}

#[test]
fn test_read_dir_lists_live_entries() {
    let fs = open_standard();
    let root = fs.read_dir("/").unwrap();
    assert_eq!(
        names(&root),
        vec![".", "..", "hello.txt", "sub", "link", "long", "broken"]
    );

    let sub = fs.read_dir("/sub").unwrap();
    assert_eq!(names(&sub), vec![".", "..", "deep.txt", "sparse"]);
    assert_eq!(sub[1].inode, ROOT);
}

#[test]
fn test_hash_indexed_directory_is_unsupported() {
    let mut b = standard_image();
    b.set_flags(SUB, INDEX_FL);
    let fs = Ext4FileSystem::open(b.build()).unwrap();

    let err = fs.read_dir("/sub").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);

    // resolution through the directory hits the same wall
    assert!(fs.resolve("/sub/deep.txt").unwrap_err().is_unsupported());
}

#[test]
fn test_short_block_map_is_structural() {
    let fs = open_standard();
    let inode = fs.read_inode(BROKEN).unwrap();

    let last = BlockMapper::map_blocks(&inode, &fs.sb_manager).last().unwrap();
    assert!(last.unwrap_err().is_structural());

    let err = fs.read_file("/broken").unwrap_err();
    assert!(err.is_structural());
}

#[test]
fn test_huge_size_with_short_map_fails_without_allocating() {
    let mut b = standard_image();
    // i_size_high: size becomes 2^50 + 3000, still one mapped block
    let off = ImageBuilder::inode_offset(BROKEN);
    write_u32_le(&mut b.image, off + 0x6C, 1 << 18);
    let fs = Ext4FileSystem::open(b.build()).unwrap();
    assert_eq!(fs.stat("/broken").unwrap().i_size, (1 << 50) + 3000);

    let err = fs.read_file("/broken").unwrap_err();
    assert!(err.is_structural());
}

#[test]
fn test_leaf_extent_lengths_match_size() {
    let fs = open_standard();
    let inode = fs.read_inode(HELLO).unwrap();
    let blocks = BlockMapper::map_blocks(&inode, &fs.sb_manager)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        blocks.len() as u64,
        inode.i_size.div_ceil(BLOCK_SIZE as u64)
    );
}

#[test]
fn test_inode_locations_cross_groups() {
    let sb = SuperBlock::parse(&raw_super_block(256, 64, 128, 32)).unwrap();
    sb.validate().unwrap();
    let manager = SuperBlockManager::from_super_block(sb);

    let first = InodeReader::locate(&manager, 1).unwrap();
    assert_eq!((first.group, first.index), (0, 0));

    let next = InodeReader::locate(&manager, INODES_PER_GROUP + 1).unwrap();
    assert_eq!((next.group, next.index), (1, 0));

    let err = InodeReader::locate(&manager, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(InodeReader::locate(&manager, 65).is_err());
}

#[test]
fn test_second_group_inode_read_through_packed_descriptor() {
    let mut b = ImageBuilder::with_groups(2);
    let second_table = BLOCKS as u64 + 5;
    let data_block = BLOCKS as u64 + 9;

    // group 1's descriptor follows group 0's in the same block
    let gdt = 2 * BLOCK_SIZE;
    write_u32_le(&mut b.image, gdt + 32, BLOCKS + 3);
    write_u32_le(&mut b.image, gdt + 32 + 0x04, BLOCKS + 4);
    write_u32_le(&mut b.image, gdt + 32 + 0x08, second_table as u32);

    b.block_mut(data_block)[..6].copy_from_slice(b"group1");
    b.put_inode_at(
        second_table as usize * BLOCK_SIZE,
        S_IFREG | 0o644,
        6,
        0,
        direct_payload(&[data_block as u32]),
    );
    let fs = Ext4FileSystem::open(b.build()).unwrap();
    assert_eq!(fs.sb_manager.group_count, 2);

    let ino = INODES_PER_GROUP + 1;
    assert_eq!(
        GroupResolver::desc_offset(&fs.sb_manager, 1),
        2 * BLOCK_SIZE as u64 + 32
    );
    let inode = fs.read_inode(ino).unwrap();
    assert!(inode.is_file());
    assert_eq!(inode.i_size, 6);

    let mut buf = [0u8; 16];
    assert_eq!(InodeOps::read(&fs, ino, 0, &mut buf).unwrap(), 6);
    assert_eq!(&buf[..6], b"group1");
}

#[test]
fn test_inode_table_beyond_byte_range_is_structural() {
    let mut b = standard_image();
    let incompat = INCOMPAT_FILETYPE | INCOMPAT_EXTENTS | INCOMPAT_64BIT;
    write_u32_le(&mut b.image, 1024 + 0x60, incompat);
    write_u16_le(&mut b.image, 1024 + 0xFE, 64);
    // bg_inode_table_hi of group 0
    write_u32_le(&mut b.image, 2 * BLOCK_SIZE + 0x28, 0xFFFF_FFFF);
    let image = b.build();

    let fs = Ext4FileSystem::open(image.clone()).unwrap();
    assert!(fs.sb_manager.is_64bit);
    assert!(fs.read_inode(ROOT).unwrap_err().is_structural());

    let err = OpenOptions::new()
        .check_descriptors(true)
        .open(image)
        .err()
        .unwrap();
    assert!(err.is_structural());
}

#[test]
fn test_overflowing_dir_block_is_structural() {
    let mut b = standard_image();
    let root_block = FIRST_DATA;
    // "." claims more than the whole block
    write_u16_le(b.block_mut(root_block), 4, (BLOCK_SIZE + 4) as u16);
    let fs = Ext4FileSystem::open(b.build()).unwrap();

    assert!(fs.read_dir("/").unwrap_err().is_structural());
}

#[test]
fn test_zero_rec_len_is_structural() {
    let mut b = standard_image();
    let second = rec_len_for(b".");
    write_u16_le(b.block_mut(FIRST_DATA), second + 4, 0);
    let fs = Ext4FileSystem::open(b.build()).unwrap();

    assert!(fs.resolve("/hello.txt").unwrap_err().is_structural());
}

#[test]
fn test_path_resolution() {
    let fs = open_standard();
    assert_eq!(fs.resolve("/").unwrap(), ROOT);
    assert_eq!(fs.resolve("/hello.txt").unwrap(), HELLO);
    assert_eq!(fs.resolve("//sub/./deep.txt").unwrap(), DEEP);
    assert_eq!(fs.resolve("/sub/../hello.txt").unwrap(), HELLO);
    assert_eq!(fs.resolve_parent("/sub/deep.txt").unwrap(), (SUB, "deep.txt".to_string()));

    // the link itself, not its target
    assert_eq!(fs.resolve("/link").unwrap(), LINK);
}

#[test]
fn test_path_resolution_errors_name_the_path() {
    let fs = open_standard();

    let err = fs.resolve("/sub/missing").unwrap_err();
    assert!(matches!(&err, Ext4Error::NotFound(p) if p == "/sub/missing"));

    let err = fs.resolve("/hello.txt/x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotADirectory);
    assert!(matches!(&err, Ext4Error::NotDirectory(p) if p == "/hello.txt"));

    let err = fs.resolve("hello.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert!(fs.resolve_parent("/").is_err());
}

#[test]
fn test_read_file_trims_last_block() {
    let fs = open_standard();
    let file = fs.open_file("/hello.txt").unwrap();
    assert_eq!(file.ino(), HELLO);
    assert_eq!(file.size(), 1500);
    assert_eq!(fs.read(&file).unwrap(), hello_content());

    assert_eq!(fs.read_file("/sub/deep.txt").unwrap(), b"deep!");
}

#[test]
fn test_sparse_direct_file_reads_zeros() {
    let fs = open_standard();
    let data = fs.read_file("/sub/sparse").unwrap();
    assert_eq!(data.len(), 2 * BLOCK_SIZE);
    assert!(data[..BLOCK_SIZE].iter().all(|&b| b == 0));
    assert!(data[BLOCK_SIZE..].iter().all(|&b| b == 0xAB));

    let file = fs.open_file("/sub/sparse").unwrap();
    let mut buf = [0xFFu8; 8];
    assert_eq!(file.read_at(1020, &mut buf).unwrap(), 8);
    assert_eq!(buf, [0, 0, 0, 0, 0xAB, 0xAB, 0xAB, 0xAB]);
}

#[test]
fn test_read_at_is_eof_aware() {
    let fs = open_standard();
    let file = fs.open_file("/hello.txt").unwrap();
    let content = hello_content();

    let mut buf = [0u8; 100];
    assert_eq!(file.read_at(1000, &mut buf).unwrap(), 100);
    assert_eq!(&buf[..], &content[1000..1100]);

    assert_eq!(file.read_at(1450, &mut buf).unwrap(), 50);
    assert_eq!(&buf[..50], &content[1450..]);

    assert_eq!(file.read_at(1500, &mut buf).unwrap(), 0);
    assert_eq!(InodeOps::read(&fs, HELLO, 1499, &mut buf).unwrap(), 1);
}

#[test]
fn test_file_implements_read_and_seek() {
    let fs = open_standard();
    let mut file = fs.open_file("/hello.txt").unwrap();

    file.seek(SeekFrom::End(-10)).unwrap();
    let mut tail = Vec::new();
    file.read_to_end(&mut tail).unwrap();
    assert_eq!(tail, &hello_content()[1490..]);

    assert!(file.seek(SeekFrom::Current(-2000)).is_err());
}

#[test]
fn test_open_file_refuses_dirs_and_links() {
    let fs = open_standard();
    assert_eq!(
        fs.open_file("/sub").unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(
        fs.open_file("/link").unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(
        fs.read_dir("/hello.txt").unwrap_err().kind(),
        ErrorKind::NotADirectory
    );
}

#[test]
fn test_read_link_fast_and_slow() {
    let fs = open_standard();
    assert_eq!(fs.read_link("/link").unwrap(), "hello.txt");
    assert!(fs.stat("/link").unwrap().is_fast_symlink(BLOCK_SIZE));

    assert_eq!(fs.read_link("/long").unwrap(), long_target());
    assert!(!fs.stat("/long").unwrap().is_fast_symlink(BLOCK_SIZE));

    assert!(fs.read_link("/hello.txt").is_err());
    assert_eq!(fs.readlink(LINK).unwrap(), "hello.txt");
}

#[test]
fn test_fast_symlink_with_xattr_block_reads_payload() {
    let mut b = standard_image();
    let off = ImageBuilder::inode_offset(LINK);
    write_u32_le(&mut b.image, off + 0x1C, 2);
    write_u32_le(&mut b.image, off + 0x68, 100);
    let fs = Ext4FileSystem::open(b.build()).unwrap();

    assert!(fs.stat("/link").unwrap().is_fast_symlink(BLOCK_SIZE));
    assert_eq!(fs.read_link("/link").unwrap(), "hello.txt");
}

#[test]
fn test_inode_ops_trait() {
    let fs = open_standard();
    let sub = fs.lookup(ROOT, b"sub").unwrap();
    assert_eq!(sub, SUB);
    assert_eq!(fs.lookup(sub, b"deep.txt").unwrap(), DEEP);
    assert!(matches!(
        fs.lookup(ROOT, b"nope").unwrap_err(),
        Ext4Error::NotFound(_)
    ));
    assert_eq!(fs.readdir(SUB).unwrap().len(), 4);
    assert_eq!(InodeOps::stat(&fs, HELLO).unwrap().i_size, 1500);
}

#[test]
fn test_bad_magic_fails_open() {
    let mut b = standard_image();
    write_u16_le(&mut b.image, 1024 + 0x38, 0xBEEF);
    let err = Ext4FileSystem::open(b.build()).err().unwrap();
    assert!(matches!(err, Ext4Error::InvalidMagic { found: 0xBEEF }));
}

#[test]
fn test_unknown_incompat_respects_strictness() {
    let mut b = standard_image();
    let incompat = INCOMPAT_FILETYPE | INCOMPAT_EXTENTS | 0x8000_0000;
    write_u32_le(&mut b.image, 1024 + 0x60, incompat);
    let image = b.build();

    let err = Ext4FileSystem::open(image.clone()).err().unwrap();
    assert!(matches!(err, Ext4Error::IncompatibleFeature(0x8000_0000)));

    let fs = OpenOptions::new().strict_features(false).open(image).unwrap();
    assert_eq!(fs.read_file("/sub/deep.txt").unwrap(), b"deep!");
}

#[test]
fn test_descriptor_check_catches_bad_inode_table() {
    let mut b = standard_image();
    write_u32_le(&mut b.image, 2 * BLOCK_SIZE + 0x08, 200);
    let image = b.build();

    // without the check, open succeeds and the failure shows up lazily
    let fs = Ext4FileSystem::open(image.clone()).unwrap();
    assert!(fs.root().unwrap_err().is_structural());

    let err = OpenOptions::new()
        .check_descriptors(true)
        .open(image)
        .err()
        .unwrap();
    assert!(err.is_structural());
}

#[test]
fn test_group_out_of_range_is_invalid_input() {
    let fs = open_standard();
    let reader = BlockReader::new(standard_image().build());
    let err = GroupResolver::resolve(&reader, &fs.sb_manager, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(
        GroupResolver::inode_table_block(&reader, &fs.sb_manager, 0).unwrap(),
        INODE_TABLE
    );
}

#[test]
fn test_truncated_image_reports_out_of_bounds() {
    let mut b = standard_image();
    b.image.truncate(3 * BLOCK_SIZE);
    let fs = Ext4FileSystem::open(b.build()).unwrap();
    let err = fs.root().unwrap_err();
    assert!(matches!(err, Ext4Error::OutOfBounds { .. }));
    assert!(err.is_structural());
}

#[test]
fn test_close_returns_source() {
    let fs = open_standard();
    let source = fs.close();
    assert_eq!(source.into_inner().len(), BLOCKS as usize * BLOCK_SIZE);
}

#[test]
fn test_open_path_reads_image_file() {
    let image = standard_image().build().into_inner();
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut tmp, &image).unwrap();

    let fs = Ext4FileSystem::open_path(tmp.path()).unwrap();
    assert_eq!(fs.read_file("/hello.txt").unwrap(), hello_content());
}

#[test]
fn test_shared_across_threads() {
    let fs = open_standard();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..8 {
                    assert_eq!(fs.read_file("/hello.txt").unwrap(), hello_content());
                    assert_eq!(fs.resolve("/sub/deep.txt").unwrap(), DEEP);
                }
            });
        }
    });
}
