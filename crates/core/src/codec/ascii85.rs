//! ASCII85 and ASCIIHex stream decoders.

use crate::error::Result;

/// Decode ASCII85-encoded data (PDF variant).
///
/// Handles: z-encoding, `<~ ~>` markers, embedded whitespace, missing EOD.
pub fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    // Strip <~ prefix if present
    let data = if data.starts_with(b"<~") {
        &data[2..]
    } else {
        data
    };

    // Find ~> end marker, strip trailing junk
    let data = match data.iter().position(|&b| b == b'~') {
        Some(pos) => &data[..pos],
        None => data,
    };

    // Filter whitespace and expand 'z' (4 zero bytes == "!!!!!")
    let mut filtered = Vec::with_capacity(data.len());
    for &byte in data {
        match byte {
            b' ' | b'\t' | b'\n' | b'\r' | b'\x00' => {}
            b'z' => filtered.extend_from_slice(b"!!!!!"),
            b'!'..=b'u' => filtered.push(byte),
            _ => {}
        }
    }

    let mut result = Vec::with_capacity(filtered.len() / 5 * 4 + 4);
    for chunk in filtered.chunks(5) {
        if chunk.len() == 5 {
            let mut value: u32 = 0;
            for &byte in chunk {
                value = value.wrapping_mul(85).wrapping_add((byte - b'!') as u32);
            }
            result.extend_from_slice(&value.to_be_bytes());
        } else if !chunk.is_empty() {
            // Short final group: pad with 'u', emit len-1 bytes
            let mut padded = [b'u'; 5];
            padded[..chunk.len()].copy_from_slice(chunk);
            let mut value: u32 = 0;
            for &byte in &padded {
                value = value.wrapping_mul(85).wrapping_add((byte - b'!') as u32);
            }
            let bytes = value.to_be_bytes();
            result.extend_from_slice(&bytes[..chunk.len() - 1]);
        }
    }

    Ok(result)
}

/// Decode ASCIIHex-encoded data.
///
/// `>` is the EOD marker; whitespace is ignored; an odd trailing digit is
/// the high nibble of a final byte.
pub fn asciihex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;

    for &byte in data {
        if byte == b'>' {
            break;
        }
        if let Some(nibble) = hex_nibble(byte) {
            if let Some(high) = pending.take() {
                result.push((high << 4) | nibble);
            } else {
                pending = Some(nibble);
            }
        }
    }

    if let Some(high) = pending {
        result.push(high << 4);
    }

    Ok(result)
}

fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asciihex_decode_expected() {
        let data = b"48656c6c6f 20776f726c64>";
        assert_eq!(asciihex_decode(data).unwrap(), b"Hello world");
    }

    #[test]
    fn asciihex_odd_digit_pads_low_nibble() {
        assert_eq!(asciihex_decode(b"4865e>").unwrap(), b"He\xe0");
    }

    #[test]
    fn ascii85_decode_expected() {
        let data = b"<~87cURD]i,\"Ebo7~>";
        assert_eq!(ascii85_decode(data).unwrap(), b"Hello World");
    }
}
