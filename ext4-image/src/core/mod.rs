pub mod block_mapper;
pub mod dir_reader;
pub mod file_reader;
pub mod group_resolver;
pub mod inode_reader;
pub mod path_resolver;
pub mod superblock_manager;
pub mod symlink;
