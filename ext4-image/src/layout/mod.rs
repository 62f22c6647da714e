pub mod block_group;
pub mod dir_entry;
pub mod extent;
pub mod inode;
pub mod superblock;

// Shared little-endian helpers for all layout modules.
//
// Callers check the slice length once per record; offsets are constants.

#[inline]
pub(crate) fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

#[inline]
pub(crate) fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[inline]
pub(crate) fn read_u64_le(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

#[inline]
pub(crate) fn read_array<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[offset..offset + N]);
    out
}

#[inline]
pub(crate) fn write_u16_le(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn write_u32_le(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn write_u64_le(data: &mut [u8], offset: usize, value: u64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Join a split on-disk field into one normalized value.
///
/// `wide` is the feature predicate that makes the high half meaningful
/// (64BIT for block numbers, LARGE_FILE for sizes, ...). When it is false
/// the high half is ignored even if the bytes are non-zero.
#[inline]
pub fn combine_lo_hi(lo: u32, hi: u32, wide: bool) -> u64 {
    if wide {
        ((hi as u64) << 32) | lo as u64
    } else {
        lo as u64
    }
}

/// Trim a NUL-padded on-disk string.
pub(crate) fn trim_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
