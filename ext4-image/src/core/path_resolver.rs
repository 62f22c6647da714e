use log::trace;

use crate::error::{Ext4Error, Result};
use crate::fs_core::dir_reader::DirReader;
use crate::fs_core::inode_reader::InodeReader;
use crate::fs_core::superblock_manager::SuperBlockManager;
use crate::io::block_reader::BlockReader;
use crate::layout::inode::ROOT_INO;
use crate::traits::image_source::ImageSource;

/// Path resolver: convert absolute paths into inode numbers.
///
/// Symbolic links are returned as themselves, never expanded, so the final
/// component of a path may be a link and an intermediate link component
/// fails as not-a-directory.
pub struct PathResolver;

impl PathResolver {
    /// Resolve absolute path to inode number.
    pub fn resolve<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        path: &str,
    ) -> Result<u32> {
        if !path.starts_with('/') {
            return Err(Ext4Error::invalid_input(format!(
                "path must be absolute: {path:?}"
            )));
        }

        let mut current_ino = ROOT_INO;
        let mut walked = String::new();

        for component in Self::components(path) {
            let current_inode = InodeReader::read_inode(reader, super_block_manager, current_ino)?;
            if !current_inode.is_dir() {
                return Err(Ext4Error::NotDirectory(Self::display(&walked)));
            }

            walked.push('/');
            walked.push_str(component);

            current_ino = match DirReader::lookup(
                reader,
                super_block_manager,
                &current_inode,
                component.as_bytes(),
            ) {
                Err(Ext4Error::NotFound(_)) => return Err(Ext4Error::NotFound(walked)),
                other => other?,
            };
            trace!("{} -> inode {}", walked, current_ino);
        }

        Ok(current_ino)
    }

    /// Resolve parent directory and final name for absolute path.
    pub fn resolve_parent<S: ImageSource>(
        reader: &BlockReader<S>,
        super_block_manager: &SuperBlockManager,
        path: &str,
    ) -> Result<(u32, String)> {
        if !path.starts_with('/') {
            return Err(Ext4Error::invalid_input(format!(
                "path must be absolute: {path:?}"
            )));
        }

        let components: Vec<&str> = Self::components(path).collect();
        let Some((name, parents)) = components.split_last() else {
            return Err(Ext4Error::invalid_input("root has no parent"));
        };

        let parent_path = format!("/{}", parents.join("/"));
        let parent_ino = Self::resolve(reader, super_block_manager, &parent_path)?;
        Ok((parent_ino, (*name).to_string()))
    }

    /// Non-empty components other than `.`.
    fn components(path: &str) -> impl Iterator<Item = &str> {
        path.split('/').filter(|c| !c.is_empty() && *c != ".")
    }

    fn display(walked: &str) -> String {
        if walked.is_empty() {
            "/".to_string()
        } else {
            walked.to_string()
        }
    }
}
