//! Flate (zlib) stream decoder.

use crate::error::{PdfError, Result};
use std::io::Read;

/// Decode zlib-wrapped deflate data.
///
/// A clean decode is attempted first; corrupt tails (commonly truncated
/// streams or CRC damage near the end) fall back to a byte-at-a-time
/// partial decode that returns everything produced before the failure.
/// A stream that produces no output at all is a hard `DecodeError`.
pub fn flate_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    if decoder.read_to_end(&mut decompressed).is_ok() {
        return Ok(decompressed);
    }

    let partial = decompress_corrupted(data);
    if partial.is_empty() {
        return Err(PdfError::DecodeError(
            "FlateDecode: corrupt or truncated zlib data".into(),
        ));
    }
    Ok(partial)
}

/// Best-effort zlib decompression for corrupted streams.
///
/// Feeds the inflater one byte at a time and keeps the output produced up
/// to the point the decoder fails.
fn decompress_corrupted(data: &[u8]) -> Vec<u8> {
    use flate2::{Decompress, FlushDecompress, Status};
    let mut decoder = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut buf = [0u8; 4096];
    let mut i = 0usize;
    while i < data.len() {
        let before_out = decoder.total_out();
        let before_in = decoder.total_in();
        let res = decoder.decompress(&data[i..i + 1], &mut buf, FlushDecompress::None);
        let produced = (decoder.total_out() - before_out) as usize;
        if produced > 0 {
            out.extend_from_slice(&buf[..produced]);
        }
        let consumed = (decoder.total_in() - before_in) as usize;
        if consumed == 0 {
            i += 1;
        } else {
            i += consumed;
        }
        match res {
            Ok(Status::StreamEnd) | Err(_) => break,
            Ok(_) => {}
        }
    }
    out
}
