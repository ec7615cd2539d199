//! Hex rendering of wire buffers for logs and verbose output.

use std::fmt::Write;

/// Bytes shown per dump line
const LINE_WIDTH: usize = 16;

/// Lowercase hex string, no separators
pub fn hex_string(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Hex string of at most `limit` leading bytes
pub fn hex_prefix(bytes: &[u8], limit: usize) -> String {
    hex_string(&bytes[..bytes.len().min(limit)])
}

/// Canonical dump: offset, 16 hex bytes split in two groups, ASCII column
///
/// ```text
/// 00000000: 48 65 6C 6C 6F 00 01 02  03 04 05 06 07 08 09 0A  Hello...........
/// ```
pub fn hexdump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in bytes.chunks(LINE_WIDTH).enumerate() {
        let _ = write!(out, "{:08X}: ", line * LINE_WIDTH);
        for i in 0..LINE_WIDTH {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, "{:02X} ", b);
                }
                None => out.push_str("   "),
            }
            if i == LINE_WIDTH / 2 - 1 {
                out.push(' ');
            }
        }
        out.push(' ');
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}
