use std::io::ErrorKind as IoErrorKind;

use spin::Mutex;

use crate::error::{Ext4Error, Result};
use crate::traits::image_source::ImageSource;

/// Block reader wrapping an [`ImageSource`] with higher-level read operations.
///
/// The source's cursor is the only mutable state shared by every decode
/// path, so each seek+read pair runs under one lock acquisition. Readers on
/// different threads never observe each other's cursor position.
pub struct BlockReader<S: ImageSource> {
    source: Mutex<S>,
}

impl<S: ImageSource> BlockReader<S> {
    /// Create a new reader owning the given source.
    pub fn new(source: S) -> Self {
        Self {
            source: Mutex::new(source),
        }
    }

    /// Read `buf.len()` bytes starting at the given **byte** offset.
    ///
    /// A short read is reported as [`Ext4Error::OutOfBounds`]: metadata that
    /// points past the end of the image is corruption, not an I/O failure.
    pub fn read_bytes(&self, byte_offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut source = self.source.lock();
        match source.read_exact_at(byte_offset, buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::UnexpectedEof => Err(Ext4Error::OutOfBounds {
                offset: byte_offset,
                len: buf.len(),
            }),
            Err(e) => Err(Ext4Error::Io(e)),
        }
    }

    /// Read one filesystem block into `buf`.
    ///
    /// `buf.len()` is the block size.
    pub fn read_block(&self, block_no: u64, buf: &mut [u8]) -> Result<()> {
        let offset = block_no
            .checked_mul(buf.len() as u64)
            .ok_or_else(|| Ext4Error::corrupted(format!("block number {block_no} overflows")))?;
        self.read_bytes(offset, buf)
    }

    /// Give the source back, consuming the reader.
    pub fn into_inner(self) -> S {
        self.source.into_inner()
    }
}
