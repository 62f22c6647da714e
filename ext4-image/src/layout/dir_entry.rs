use std::borrow::Cow;

use super::{read_u16_le, read_u32_le};
use crate::error::{Ext4Error, Result};

/// Fixed part of a directory record: inode, rec_len, name_len, file_type.
pub const DIR_ENTRY_HEADER_SIZE: usize = 8;

/// Directory entry file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Unknown = 0,
    RegularFile = 1,
    Directory = 2,
    CharDevice = 3,
    BlockDevice = 4,
    Fifo = 5,
    Socket = 6,
    Symlink = 7,
}

impl FileType {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => FileType::RegularFile,
            2 => FileType::Directory,
            3 => FileType::CharDevice,
            4 => FileType::BlockDevice,
            5 => FileType::Fifo,
            6 => FileType::Socket,
            7 => FileType::Symlink,
            _ => FileType::Unknown,
        }
    }
}

/// Parsed directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: u32,
    pub rec_len: u16,
    pub name_len: u16,
    pub file_type: FileType,
    /// Raw name bytes; ext names are not required to be UTF-8.
    pub name: Vec<u8>,
}

impl DirEntry {
    /// Parse a directory entry from the start of `raw`.
    ///
    /// `raw` runs to the end of the current directory block, so a `rec_len`
    /// longer than `raw` would cross the block boundary. `has_filetype` is
    /// the FILETYPE incompat predicate: with it, byte 7 is a type code and
    /// the name length is one byte; without it the name length is 16 bits.
    pub fn parse(raw: &[u8], has_filetype: bool) -> Result<Self> {
        if raw.len() < DIR_ENTRY_HEADER_SIZE {
            return Err(Ext4Error::corrupted("dir entry too small"));
        }

        let inode = read_u32_le(raw, 0);
        let rec_len = read_u16_le(raw, 4);
        let (name_len, file_type) = if has_filetype {
            (raw[6] as u16, FileType::from_u8(raw[7]))
        } else {
            (read_u16_le(raw, 6), FileType::Unknown)
        };

        if (rec_len as usize) < DIR_ENTRY_HEADER_SIZE {
            return Err(Ext4Error::corrupted(format!(
                "dir entry rec_len {rec_len} < 8"
            )));
        }
        if rec_len as usize > raw.len() {
            return Err(Ext4Error::corrupted(format!(
                "dir entry rec_len {rec_len} crosses block boundary ({} bytes left)",
                raw.len()
            )));
        }
        if rec_len % 4 != 0 {
            return Err(Ext4Error::corrupted("dir entry rec_len not aligned"));
        }
        if DIR_ENTRY_HEADER_SIZE + name_len as usize > rec_len as usize {
            return Err(Ext4Error::corrupted("dir entry name exceeds rec_len"));
        }

        let name_end = DIR_ENTRY_HEADER_SIZE + name_len as usize;

        Ok(DirEntry {
            inode,
            rec_len,
            name_len,
            file_type,
            name: raw[DIR_ENTRY_HEADER_SIZE..name_end].to_vec(),
        })
    }

    /// An unused slot (deleted entry or block padding).
    pub fn is_unused(&self) -> bool {
        self.inode == 0
    }

    pub fn is_dot_or_dotdot(&self) -> bool {
        self.name == b"." || self.name == b".."
    }

    /// Name for display; invalid UTF-8 is replaced.
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}
