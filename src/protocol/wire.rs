//! Wire primitives
//!
//! Low-level encoders and decoders shared by commands and results.
//! All integers are little-endian.
//!
//! ### Packed String
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ ByteLen (4)  │  UTF-16LE code units (len)   │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! ### String Array
//! ```text
//! ┌──────────┬──────────┬─────┬──────────┬──────────┬──────────┬─────────────────┐
//! │ Off0 (4) │ Len0 (4) │ ... │ OffN (4) │ LenN (4) │ Zero (4) │ UTF-16LE data   │
//! └──────────┴──────────┴─────┴──────────┴──────────┴──────────┴─────────────────┘
//! ```
//! Offsets count from the start of the enclosing buffer, so the first string
//! of a bare array sits at `(2N+1)×4`.

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Utc};

/// Size of a wire integer
pub const U32_SIZE: usize = 4;

/// FILETIME value of 1970-01-01T00:00:00Z (http://support.microsoft.com/kb/167296)
pub const EPOCH_FILETIME: u64 = 116_444_736_000_000_000;

/// FILETIME ticks per second
pub const HUNDRED_NANOSECONDS: u64 = 10_000_000;

// =============================================================================
// Integers
// =============================================================================

/// Encode a u32 as 4 little-endian bytes
pub fn pack_u32(value: u32) -> [u8; U32_SIZE] {
    value.to_le_bytes()
}

/// Decode the first 4 bytes as a little-endian u32
///
/// Returns `None` when fewer than 4 bytes are available.
pub fn unpack_u32(data: &[u8]) -> Option<u32> {
    let bytes: [u8; U32_SIZE] = data.get(..U32_SIZE)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// Combine two 32-bit halves into one 64-bit value
pub fn low_high_to_u64(low: u32, high: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}

/// Convert a Windows FILETIME (100ns ticks since 1601-01-01) to UTC
///
/// Sub-second precision is dropped. Returns `None` when the value falls
/// outside the range chrono can represent.
pub fn filetime_to_datetime(low: u32, high: u32) -> Option<DateTime<Utc>> {
    let ticks = low_high_to_u64(low, high) as i128 - EPOCH_FILETIME as i128;
    let seconds = ticks.div_euclid(HUNDRED_NANOSECONDS as i128);
    DateTime::<Utc>::from_timestamp(i64::try_from(seconds).ok()?, 0)
}

// =============================================================================
// Strings
// =============================================================================

/// Encode text as UTF-16LE without a terminator
pub fn encode_utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Decode UTF-16LE bytes, replacing invalid sequences
///
/// A trailing odd byte is ignored.
pub fn decode_utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Byte length of `text` once encoded as UTF-16LE
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count() * 2
}

/// Encode a length-prefixed UTF-16LE string
pub fn pack_string(text: &str) -> Vec<u8> {
    let encoded = encode_utf16(text);
    let mut buf = BytesMut::with_capacity(U32_SIZE + encoded.len());
    buf.put_u32_le(encoded.len() as u32);
    buf.put_slice(&encoded);
    buf.to_vec()
}

/// Decode a length-prefixed UTF-16LE string
///
/// Returns `None` when the length prefix is missing or claims more bytes
/// than the buffer holds.
pub fn unpack_string(data: &[u8]) -> Option<String> {
    let len = unpack_u32(data)? as usize;
    let body = data.get(U32_SIZE..)?.get(..len)?;
    Some(decode_utf16(body))
}

/// Total bytes a packed string occupies, read from its length prefix
pub fn packed_len(data: &[u8]) -> Option<usize> {
    unpack_u32(data).map(|len| U32_SIZE + len as usize)
}

// =============================================================================
// String Arrays
// =============================================================================

/// Header size of an N-entry offset table, sentinel included
pub fn string_table_size(count: usize) -> usize {
    (2 * count + 1) * U32_SIZE
}

/// Compute the `(offset, length)` table for `strings`
///
/// `base` is the position of the table inside the enclosing buffer.
pub fn string_table(base: usize, strings: &[&str]) -> Vec<(u32, u32)> {
    let mut offset = base + string_table_size(strings.len());
    strings
        .iter()
        .map(|s| {
            let len = utf16_len(s);
            let entry = (offset as u32, len as u32);
            offset += len;
            entry
        })
        .collect()
}

/// Encode a string array whose table starts at the buffer start
pub fn pack_string_array(strings: &[&str]) -> Vec<u8> {
    pack_string_array_at(0, strings)
}

/// Encode a string array placed `base` bytes into an enclosing buffer
pub fn pack_string_array_at(base: usize, strings: &[&str]) -> Vec<u8> {
    let table = string_table(base, strings);
    let data_len: usize = table.iter().map(|&(_, len)| len as usize).sum();

    let mut buf = BytesMut::with_capacity(string_table_size(strings.len()) + data_len);
    for &(offset, len) in &table {
        buf.put_u32_le(offset);
        buf.put_u32_le(len);
    }
    buf.put_u32_le(0);
    for s in strings {
        buf.put_slice(&encode_utf16(s));
    }
    buf.to_vec()
}

/// Decode a string array whose table starts at the buffer start
pub fn unpack_string_array(data: &[u8]) -> Vec<String> {
    unpack_string_array_at(data, 0)
}

/// Decode a string array whose table starts at `table_start`
///
/// Offsets are relative to the start of `data`. Decoding stops at the first
/// zero offset or at the first entry that does not fit in the buffer.
pub fn unpack_string_array_at(data: &[u8], table_start: usize) -> Vec<String> {
    let mut strings = Vec::new();
    let mut pos = table_start;

    loop {
        let Some(offset) = data.get(pos..).and_then(unpack_u32) else {
            break;
        };
        if offset == 0 {
            break;
        }
        let Some(len) = data.get(pos + U32_SIZE..).and_then(unpack_u32) else {
            break;
        };
        let (start, len) = (offset as usize, len as usize);
        let Some(body) = start.checked_add(len).and_then(|end| data.get(start..end)) else {
            break;
        };
        strings.push(decode_utf16(body));
        pos += 2 * U32_SIZE;
    }

    strings
}
