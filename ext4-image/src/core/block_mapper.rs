use crate::error::{Ext4Error, Result};
use crate::fs_core::superblock_manager::SuperBlockManager;
use crate::layout::extent::{Extent, ExtentEntries, ExtentNode};
use crate::layout::inode::{BlockMapping, DIRECT_BLOCKS, IND_BLOCK, Inode};

/// Mapping result for one logical block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedBlock {
    pub logical: u64,
    pub physical: u64,
    /// Block belongs to a preallocated extent and reads as zeros.
    pub uninitialized: bool,
}

/// Block mapper.
///
/// Converts an inode's logical blocks into physical blocks, dispatching on
/// the [`BlockMapping`] decoded with the inode. Two layouts are deliberately
/// not walked and report [`Ext4Error::Unsupported`]: extent trees deeper than
/// the root node, and the indirect slots of the classic map.
pub struct BlockMapper;

impl BlockMapper {
    /// Lazily produce `(logical, physical)` pairs covering the inode's size.
    ///
    /// The sequence is ordered by logical block, finite, and meant to be
    /// consumed once. Every logical block below `ceil(i_size / block_size)`
    /// must be accounted for: a zero direct pointer is a hole and is skipped,
    /// but an extent list that stops short of the size is not. In that case
    /// the last item is a structural error instead of a short sequence.
    pub fn map_blocks<'a>(inode: &'a Inode, super_block_manager: &SuperBlockManager) -> BlockMap<'a> {
        let needed = super_block_manager.blocks_for_size(inode.i_size);

        let cursor = match Self::check_supported(inode, needed) {
            Err(e) => Cursor::Failed(Some(e)),
            Ok(()) => match &inode.mapping {
                BlockMapping::Direct { pointers } => Cursor::Direct { pointers, next: 0 },
                BlockMapping::Extent(node) => match &node.entries {
                    ExtentEntries::Leaf(extents) => Cursor::Extents {
                        extents,
                        index: 0,
                        offset: 0,
                        prev_end: 0,
                    },
                    ExtentEntries::Index(_) => Cursor::Failed(Some(deep_tree_error(node))),
                },
            },
        };

        BlockMap {
            cursor,
            needed,
            covered: 0,
            finished: false,
        }
    }

    /// Translate a single logical block.
    ///
    /// Returns `Ok(None)` when no mapping covers the block.
    pub fn map_logical(inode: &Inode, logical: u64) -> Result<Option<MappedBlock>> {
        if inode.has_inline_data() {
            return Err(Ext4Error::unsupported("inline data"));
        }
        match &inode.mapping {
            BlockMapping::Direct { pointers } => {
                if logical >= DIRECT_BLOCKS as u64 {
                    return Err(indirect_error(logical + 1));
                }
                let ptr = pointers[logical as usize];
                Ok((ptr != 0).then_some(MappedBlock {
                    logical,
                    physical: ptr as u64,
                    uninitialized: false,
                }))
            }
            BlockMapping::Extent(node) => {
                let ExtentEntries::Leaf(extents) = &node.entries else {
                    return Err(deep_tree_error(node));
                };
                Ok(extents
                    .iter()
                    .find(|ext| logical >= ext.ee_block as u64 && logical < ext.logical_end())
                    .map(|ext| MappedBlock {
                        logical,
                        physical: ext.physical_start() + (logical - ext.ee_block as u64),
                        uninitialized: ext.is_uninitialized(),
                    }))
            }
        }
    }

    fn check_supported(inode: &Inode, needed: u64) -> Result<()> {
        if inode.has_inline_data() {
            return Err(Ext4Error::unsupported("inline data"));
        }
        if matches!(inode.mapping, BlockMapping::Direct { .. }) && needed > DIRECT_BLOCKS as u64 {
            return Err(indirect_error(needed));
        }
        Ok(())
    }
}

fn deep_tree_error(node: &ExtentNode) -> Ext4Error {
    Ext4Error::unsupported(format!("extent tree of depth {}", node.depth()))
}

fn indirect_error(needed: u64) -> Ext4Error {
    Ext4Error::unsupported(format!(
        "indirect block addressing through i_block[{IND_BLOCK}] ({needed} blocks, {DIRECT_BLOCKS} direct slots)"
    ))
}

enum Cursor<'a> {
    Direct {
        pointers: &'a [u32; 15],
        next: u64,
    },
    Extents {
        extents: &'a [Extent],
        index: usize,
        /// Next block within `extents[index]`.
        offset: u32,
        /// End of the previous extent, for the ordering check.
        prev_end: u64,
    },
    Failed(Option<Ext4Error>),
}

/// Lazy block sequence returned by [`BlockMapper::map_blocks`].
pub struct BlockMap<'a> {
    cursor: Cursor<'a>,
    needed: u64,
    /// Logical blocks accounted for so far, holes included.
    covered: u64,
    finished: bool,
}

impl BlockMap<'_> {
    /// Blocks the inode's size requires.
    pub fn needed(&self) -> u64 {
        self.needed
    }

    fn next_mapped(&mut self) -> Option<Result<MappedBlock>> {
        let needed = self.needed;
        match &mut self.cursor {
            Cursor::Failed(err) => err.take().map(Err),
            Cursor::Direct { pointers, next } => {
                while *next < needed {
                    let logical = *next;
                    *next += 1;
                    let ptr = pointers[logical as usize];
                    // Zero pointer: sparse hole, counted as covered.
                    self.covered += 1;
                    if ptr != 0 {
                        return Some(Ok(MappedBlock {
                            logical,
                            physical: ptr as u64,
                            uninitialized: false,
                        }));
                    }
                }
                None
            }
            Cursor::Extents {
                extents,
                index,
                offset,
                prev_end,
            } => loop {
                let ext = extents.get(*index)?;
                if *offset == 0 {
                    if (ext.ee_block as u64) < *prev_end {
                        return Some(Err(Ext4Error::corrupted(format!(
                            "extent at logical block {} overlaps or precedes block {}",
                            ext.ee_block, prev_end
                        ))));
                    }
                    *prev_end = ext.logical_end();
                }

                let logical = ext.ee_block as u64 + *offset as u64;
                if *offset >= ext.block_count() || logical >= needed {
                    // Extents are sorted: once past EOF nothing else counts.
                    if logical >= needed {
                        return None;
                    }
                    *index += 1;
                    *offset = 0;
                    continue;
                }

                *offset += 1;
                self.covered += 1;
                return Some(Ok(MappedBlock {
                    logical,
                    physical: ext.physical_start() + (logical - ext.ee_block as u64),
                    uninitialized: ext.is_uninitialized(),
                }));
            },
        }
    }
}

impl Iterator for BlockMap<'_> {
    type Item = Result<MappedBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_mapped() {
            Some(Err(e)) => {
                self.finished = true;
                Some(Err(e))
            }
            Some(ok) => Some(ok),
            None => {
                self.finished = true;
                (self.covered < self.needed).then(|| {
                    Err(Ext4Error::corrupted(format!(
                        "block map covers {} of {} blocks needed for the inode size",
                        self.covered, self.needed
                    )))
                })
            }
        }
    }
}
