use crate::error::{Ext4Error, Result};
use crate::fs_core::block_mapper::BlockMapper;
use crate::fs_core::superblock_manager::SuperBlockManager;
use crate::io::block_reader::BlockReader;
use crate::layout::inode::Inode;
use crate::traits::image_source::ImageSource;

/// File data reader.
///
/// Reads bytes from an inode by resolving logical blocks through the
/// [`BlockMapper`]. Holes and uninitialized extents read as zeros.
pub struct FileReader;

impl FileReader {
    /// Read the whole content of `inode`, `i_size` bytes.
    ///
    /// The final block is trimmed to the declared size. A block map that
    /// cannot cover the size fails the read instead of returning short data.
    pub fn read_all<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        inode: &Inode,
    ) -> Result<Vec<u8>> {
        let size = usize::try_from(inode.i_size)
            .map_err(|_| Ext4Error::invalid_input("file does not fit in memory"))?;
        let block_size = super_block_manager.block_size;
        // Grown as blocks arrive so a bogus size fails on the block map
        // before anything that large is allocated.
        let mut out = Vec::new();
        let mut scratch = vec![0u8; block_size];

        for mapped in BlockMapper::map_blocks(inode, super_block_manager) {
            let mapped = mapped?;
            let start = mapped.logical as usize * block_size;
            let len = block_size.min(size - start);
            out.resize(start, 0);
            if mapped.uninitialized {
                out.resize(start + len, 0);
                continue;
            }
            reader.read_block(mapped.physical, &mut scratch)?;
            out.extend_from_slice(&scratch[..len]);
        }
        // Trailing holes of the classic map.
        out.resize(size, 0);

        Ok(out)
    }

    /// Read file bytes at `offset` into `buf`.
    ///
    /// Returns the number of bytes actually read (EOF-aware).
    pub fn read<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        inode: &Inode,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize> {
        if buf.is_empty() || offset >= inode.i_size {
            return Ok(0);
        }

        let block_size = super_block_manager.block_size;
        let file_remaining = inode.i_size - offset;
        let to_read = (buf.len() as u64).min(file_remaining) as usize;

        let mut scratch = vec![0u8; block_size];
        let mut copied = 0usize;
        let mut current_logical = offset / block_size as u64;
        let mut offset_in_block = (offset % block_size as u64) as usize;

        while copied < to_read {
            let in_this_block = (block_size - offset_in_block).min(to_read - copied);
            let dest = &mut buf[copied..copied + in_this_block];

            match BlockMapper::map_logical(inode, current_logical)? {
                Some(m) if !m.uninitialized => {
                    reader.read_block(m.physical, &mut scratch)?;
                    dest.copy_from_slice(&scratch[offset_in_block..offset_in_block + in_this_block]);
                }
                Some(_) => dest.fill(0),
                None if inode.uses_extents() => {
                    return Err(Ext4Error::corrupted(format!(
                        "no extent maps logical block {current_logical} inside the file size"
                    )));
                }
                // Sparse hole in the classic map.
                None => dest.fill(0),
            }

            copied += in_this_block;
            current_logical += 1;
            offset_in_block = 0;
        }

        Ok(copied)
    }
}
