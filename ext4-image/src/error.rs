use std::borrow::Cow;

use thiserror::Error;

/// Coarse classification of an [`Ext4Error`].
///
/// Lets callers tell "this image is corrupt" apart from "this image uses
/// something we do not decode yet" without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The underlying byte source failed.
    Io,
    /// On-disk metadata violates an ext invariant.
    Structural,
    /// The image uses a layout this reader does not decode.
    UnsupportedFeature,
    /// A path component does not exist.
    NotFound,
    /// A path component that must be a directory is not one.
    NotADirectory,
    /// The caller passed an invalid argument.
    InvalidInput,
}

/// Unified error type for ext4-image.
#[derive(Debug, Error)]
pub enum Ext4Error {
    /// I/O error from the byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Super block magic is not 0xEF53.
    #[error("invalid super block magic {found:#06x}")]
    InvalidMagic { found: u16 },

    /// Block and inode counts imply different numbers of block groups.
    #[error("block/inode group mismatch: {by_blocks} groups by blocks, {by_inodes} by inodes")]
    GroupCountMismatch { by_blocks: u64, by_inodes: u64 },

    /// Corrupted filesystem metadata.
    #[error("corrupted filesystem: {0}")]
    CorruptedFs(Cow<'static, str>),

    /// A metadata read ran past the end of the image.
    #[error("read of {len} bytes at offset {offset} is beyond the end of the image")]
    OutOfBounds { offset: u64, len: usize },

    /// Layout or feature this reader does not decode.
    #[error("unsupported feature: {0}")]
    Unsupported(Cow<'static, str>),

    /// Unknown incompatible feature bits.
    #[error("unknown incompatible feature bits {0:#x}")]
    IncompatibleFeature(u32),

    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Expected a directory inode but got another type.
    #[error("not a directory: {0}")]
    NotDirectory(String),

    /// Invalid caller argument.
    #[error("invalid input: {0}")]
    InvalidInput(Cow<'static, str>),
}

impl Ext4Error {
    pub(crate) fn corrupted(detail: impl Into<Cow<'static, str>>) -> Self {
        Ext4Error::CorruptedFs(detail.into())
    }

    pub(crate) fn unsupported(detail: impl Into<Cow<'static, str>>) -> Self {
        Ext4Error::Unsupported(detail.into())
    }

    pub(crate) fn invalid_input(detail: impl Into<Cow<'static, str>>) -> Self {
        Ext4Error::InvalidInput(detail.into())
    }

    /// Which of the error families this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Ext4Error::Io(_) => ErrorKind::Io,
            Ext4Error::InvalidMagic { .. }
            | Ext4Error::GroupCountMismatch { .. }
            | Ext4Error::CorruptedFs(_)
            | Ext4Error::OutOfBounds { .. } => ErrorKind::Structural,
            Ext4Error::Unsupported(_) | Ext4Error::IncompatibleFeature(_) => {
                ErrorKind::UnsupportedFeature
            }
            Ext4Error::NotFound(_) => ErrorKind::NotFound,
            Ext4Error::NotDirectory(_) => ErrorKind::NotADirectory,
            Ext4Error::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.kind() == ErrorKind::Structural
    }

    pub fn is_unsupported(&self) -> bool {
        self.kind() == ErrorKind::UnsupportedFeature
    }
}

impl From<Ext4Error> for std::io::Error {
    fn from(err: Ext4Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::Io => match err {
                Ext4Error::Io(inner) => return inner,
                _ => std::io::ErrorKind::Other,
            },
            ErrorKind::Structural => std::io::ErrorKind::InvalidData,
            ErrorKind::UnsupportedFeature => std::io::ErrorKind::Unsupported,
            ErrorKind::NotFound => std::io::ErrorKind::NotFound,
            ErrorKind::NotADirectory => std::io::ErrorKind::NotADirectory,
            ErrorKind::InvalidInput => std::io::ErrorKind::InvalidInput,
        };
        std::io::Error::new(kind, err)
    }
}

/// Convenience Result type alias.
pub type Result<T> = ::core::result::Result<T, Ext4Error>;
