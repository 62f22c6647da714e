use crate::error::{Ext4Error, Result};
use crate::fs_core::file_reader::FileReader;
use crate::fs_core::superblock_manager::SuperBlockManager;
use crate::io::block_reader::BlockReader;
use crate::layout::inode::Inode;
use crate::traits::image_source::ImageSource;

pub struct SymlinkReader;

impl SymlinkReader {
    /// Target of a symbolic link inode.
    ///
    /// Short targets live in the 60-byte `i_block` payload and own no data
    /// blocks; longer ones are file content.
    pub fn read_symlink<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        inode: &Inode,
    ) -> Result<String> {
        if !inode.is_symlink() {
            return Err(Ext4Error::invalid_input(format!(
                "inode with mode {:#o} is not a symbolic link",
                inode.i_mode
            )));
        }

        let raw = match inode.is_fast_symlink(super_block_manager.block_size) {
            true => inode.i_block[..inode.i_size as usize].to_vec(),
            false => FileReader::read_all(reader, super_block_manager, inode)?,
        };

        String::from_utf8(raw).map_err(|e| {
            Ext4Error::corrupted(format!(
                "symlink target is not UTF-8 at byte {}",
                e.utf8_error().valid_up_to()
            ))
        })
    }
}
