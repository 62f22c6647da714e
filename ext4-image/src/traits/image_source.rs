use std::io::{Read, Seek, SeekFrom};

/// Byte source abstraction: the I/O foundation for the entire reader.
///
/// Any addressable image works: a regular file, a block device node, or an
/// in-memory buffer behind `std::io::Cursor`. Access is always an absolute
/// seek followed by an exact-length read.
pub trait ImageSource {
    /// Fill `buf` with the bytes starting at absolute `offset`.
    ///
    /// Moves the source's cursor; callers serialize access through
    /// [`BlockReader`](crate::io::block_reader::BlockReader).
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()>;
}

impl<T: Read + Seek + ?Sized> ImageSource for T {
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }
}
