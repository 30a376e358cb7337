//! LZW stream decoder using the weezl crate.

use crate::error::Result;
use weezl::{BitOrder, decode::Decoder};

/// Decode LZW-encoded data (PDF variant: MSB first, 8-bit symbols).
pub fn lzw_decode(data: &[u8]) -> Result<Vec<u8>> {
    lzw_decode_with_earlychange(data, 1)
}

/// Decode LZW-encoded data with an explicit EarlyChange setting.
///
/// EarlyChange=1 (widen the code size one code early) is the PDF default;
/// EarlyChange=0 uses TIFF-style size switching.
pub fn lzw_decode_with_earlychange(data: &[u8], early_change: i64) -> Result<Vec<u8>> {
    let mut decoder = if early_change == 0 {
        Decoder::new(BitOrder::Msb, 8)
    } else {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    };
    let mut output = Vec::new();
    // Lenient on corrupt tails: keep whatever decoded cleanly.
    let _ = decoder.into_vec(&mut output).decode(data);
    Ok(output)
}
