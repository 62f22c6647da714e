use crate::error::{Ext4Error, Result};
use crate::layout::{read_u16_le, read_u32_le};

/// Extent tree magic in ext4.
pub const EXTENT_HEADER_MAGIC: u16 = 0xF30A;

/// Size of the header and of every entry that follows it.
pub const EXTENT_ENTRY_SIZE: usize = 12;

/// `ee_len` values above this mark an uninitialized extent.
pub const EXT_INIT_MAX_LEN: u16 = 1 << 15;

/// Parsed extent header (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtentHeader {
    pub eh_magic: u16,
    pub eh_entries: u16,
    pub eh_max: u16,
    pub eh_depth: u16,
    pub eh_generation: u32,
}

/// Parsed extent index entry (internal node, 12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtentIndex {
    pub ei_block: u32,
    pub ei_leaf_lo: u32,
    pub ei_leaf_hi: u16,
}

/// Parsed extent leaf entry (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub ee_block: u32,
    pub ee_len: u16,
    pub ee_start_hi: u16,
    pub ee_start_lo: u32,
}

/// Entries of one extent tree node, typed by the node's depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtentEntries {
    /// `eh_depth == 0`: entries name physical runs directly.
    Leaf(Vec<Extent>),
    /// `eh_depth > 0`: entries point at deeper tree blocks.
    Index(Vec<ExtentIndex>),
}

/// One decoded extent tree node (header plus its entries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtentNode {
    pub header: ExtentHeader,
    pub entries: ExtentEntries,
}

impl ExtentHeader {
    /// Parse and validate an extent header.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < EXTENT_ENTRY_SIZE {
            return Err(Ext4Error::corrupted("extent header too small"));
        }

        let header = ExtentHeader {
            eh_magic: read_u16_le(raw, 0x00),
            eh_entries: read_u16_le(raw, 0x02),
            eh_max: read_u16_le(raw, 0x04),
            eh_depth: read_u16_le(raw, 0x06),
            eh_generation: read_u32_le(raw, 0x08),
        };

        if header.eh_magic != EXTENT_HEADER_MAGIC {
            return Err(Ext4Error::corrupted("invalid extent header magic"));
        }
        if header.eh_entries > header.eh_max {
            return Err(Ext4Error::corrupted("extent header entries > max"));
        }

        Ok(header)
    }

    pub fn is_leaf(&self) -> bool {
        self.eh_depth == 0
    }
}

impl ExtentIndex {
    /// Parse an extent index entry.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < EXTENT_ENTRY_SIZE {
            return Err(Ext4Error::corrupted("extent index too small"));
        }
        Ok(ExtentIndex {
            ei_block: read_u32_le(raw, 0x00),
            ei_leaf_lo: read_u32_le(raw, 0x04),
            ei_leaf_hi: read_u16_le(raw, 0x08),
        })
    }

    /// Child extent block physical address.
    pub fn child_block(&self) -> u64 {
        ((self.ei_leaf_hi as u64) << 32) | self.ei_leaf_lo as u64
    }
}

impl Extent {
    /// Parse a leaf extent entry.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < EXTENT_ENTRY_SIZE {
            return Err(Ext4Error::corrupted("extent leaf too small"));
        }
        Ok(Extent {
            ee_block: read_u32_le(raw, 0x00),
            ee_len: read_u16_le(raw, 0x04),
            ee_start_hi: read_u16_le(raw, 0x06),
            ee_start_lo: read_u32_le(raw, 0x08),
        })
    }

    /// Physical start block this extent maps to (48 bits).
    pub fn physical_start(&self) -> u64 {
        ((self.ee_start_hi as u64) << 32) | self.ee_start_lo as u64
    }

    /// Number of blocks in this extent.
    ///
    /// A length of exactly 32768 is an initialized extent; larger values are
    /// uninitialized extents of `ee_len - 32768` blocks.
    pub fn block_count(&self) -> u32 {
        if self.ee_len <= EXT_INIT_MAX_LEN {
            self.ee_len as u32
        } else {
            (self.ee_len - EXT_INIT_MAX_LEN) as u32
        }
    }

    /// Whether this extent is uninitialized (preallocated).
    pub fn is_uninitialized(&self) -> bool {
        self.ee_len > EXT_INIT_MAX_LEN
    }

    /// One past the last logical block covered.
    pub fn logical_end(&self) -> u64 {
        self.ee_block as u64 + self.block_count() as u64
    }
}

impl ExtentNode {
    /// Parse a whole node: header followed by `eh_entries` records, the
    /// i-th record starting at byte `12 + 12 * i`.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let header = ExtentHeader::parse(raw)?;
        let count = header.eh_entries as usize;
        let table_bytes = EXTENT_ENTRY_SIZE + count * EXTENT_ENTRY_SIZE;
        if raw.len() < table_bytes {
            return Err(Ext4Error::corrupted("extent node truncated"));
        }

        let records = (0..count).map(|i| {
            let off = EXTENT_ENTRY_SIZE + i * EXTENT_ENTRY_SIZE;
            &raw[off..off + EXTENT_ENTRY_SIZE]
        });

        let entries = if header.is_leaf() {
            ExtentEntries::Leaf(records.map(Extent::parse).collect::<Result<_>>()?)
        } else {
            ExtentEntries::Index(records.map(ExtentIndex::parse).collect::<Result<_>>()?)
        };

        Ok(ExtentNode { header, entries })
    }

    pub fn depth(&self) -> u16 {
        self.header.eh_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{write_u16_le, write_u32_le};

    fn header(buf: &mut [u8], entries: u16, max: u16, depth: u16) {
        write_u16_le(buf, 0, EXTENT_HEADER_MAGIC);
        write_u16_le(buf, 2, entries);
        write_u16_le(buf, 4, max);
        write_u16_le(buf, 6, depth);
    }

    #[test]
    fn test_leaf_node_entries_at_twelve_byte_stride() {
        let mut raw = [0u8; 60];
        header(&mut raw, 2, 4, 0);
        write_u32_le(&mut raw, 12, 0);
        write_u16_le(&mut raw, 16, 3);
        write_u16_le(&mut raw, 18, 0x1);
        write_u32_le(&mut raw, 20, 0x10);
        write_u32_le(&mut raw, 24, 3);
        write_u16_le(&mut raw, 28, 2);
        write_u32_le(&mut raw, 32, 0x40);

        let node = ExtentNode::parse(&raw).unwrap();
        let ExtentEntries::Leaf(extents) = node.entries else {
            panic!("expected leaf");
        };
        assert_eq!(extents.len(), 2);
        assert_eq!(extents[0].physical_start(), (1u64 << 32) | 0x10);
        assert_eq!(extents[0].block_count(), 3);
        assert_eq!(extents[1].ee_block, 3);
        assert_eq!(extents[1].physical_start(), 0x40);
        assert_eq!(extents[1].logical_end(), 5);
    }

    #[test]
    fn test_index_node_decodes_children() {
        let mut raw = [0u8; 60];
        header(&mut raw, 1, 4, 1);
        write_u32_le(&mut raw, 12, 0);
        write_u32_le(&mut raw, 16, 900);
        write_u16_le(&mut raw, 20, 2);

        let node = ExtentNode::parse(&raw).unwrap();
        assert_eq!(node.depth(), 1);
        let ExtentEntries::Index(indexes) = node.entries else {
            panic!("expected index");
        };
        assert_eq!(indexes[0].child_block(), (2u64 << 32) | 900);
    }

    #[test]
    fn test_bad_headers_rejected() {
        let mut raw = [0u8; 60];
        assert!(ExtentNode::parse(&raw).is_err());

        header(&mut raw, 5, 4, 0);
        assert!(ExtentNode::parse(&raw).is_err());

        header(&mut raw, 4, 10, 0);
        assert!(ExtentNode::parse(&raw[..24]).is_err());
    }

    #[test]
    fn test_uninitialized_length_encoding() {
        let init = Extent {
            ee_block: 0,
            ee_len: EXT_INIT_MAX_LEN,
            ee_start_hi: 0,
            ee_start_lo: 0,
        };
        assert!(!init.is_uninitialized());
        assert_eq!(init.block_count(), 32768);

        let prealloc = Extent {
            ee_len: EXT_INIT_MAX_LEN + 8,
            ..init
        };
        assert!(prealloc.is_uninitialized());
        assert_eq!(prealloc.block_count(), 8);
    }
}
