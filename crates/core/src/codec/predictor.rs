//! Predictor post-processing for Flate/LZW streams.
//!
//! Predictors are a byte-differencing transform applied before compression
//! to make image-like data compress better; decoding must undo them after
//! decompression. Predictor 2 is TIFF horizontal differencing; 10-15 are
//! the PNG per-row filters (the row's leading filter byte selects the
//! actual algorithm, so all PNG values decode identically here).

use crate::error::{PdfError, Result};

/// Undo the predictor named by a DecodeParms dictionary.
///
/// `predictor` 1 (or 0) is a no-op. Values other than 1, 2 and 10-15 are
/// rejected.
pub fn apply_predictor(
    predictor: usize,
    data: &[u8],
    columns: usize,
    colors: usize,
    bits_per_component: usize,
) -> Result<Vec<u8>> {
    match predictor {
        0 | 1 => Ok(data.to_vec()),
        2 => tiff_predictor(data, columns, colors, bits_per_component),
        10..=15 => png_predictor(data, columns, colors, bits_per_component),
        other => Err(PdfError::DecodeError(format!(
            "unsupported predictor: {}",
            other
        ))),
    }
}

/// Undo PNG per-row prediction.
///
/// Each row carries a leading filter byte: 0=None, 1=Sub, 2=Up, 3=Average,
/// 4=Paeth. A trailing short row is dropped.
fn png_predictor(
    data: &[u8],
    columns: usize,
    colors: usize,
    bits_per_component: usize,
) -> Result<Vec<u8>> {
    let row_bytes = (colors * columns * bits_per_component).div_ceil(8);
    if row_bytes == 0 {
        return Ok(Vec::new());
    }
    let bpp = std::cmp::max(1, colors * bits_per_component / 8); // bytes per pixel
    let row_size = row_bytes + 1; // +1 for the filter byte

    let mut result = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];

    for row_start in (0..data.len()).step_by(row_size) {
        if row_start + row_size > data.len() {
            break;
        }

        let filter_type = data[row_start];
        let row_data = &data[row_start + 1..row_start + row_size];
        let mut current_row = vec![0u8; row_bytes];

        match filter_type {
            0 => {
                current_row.copy_from_slice(row_data);
            }
            1 => {
                // Sub: left neighbour
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    current_row[i] = row_data[i].wrapping_add(left);
                }
            }
            2 => {
                // Up: byte above
                for i in 0..row_bytes {
                    current_row[i] = row_data[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                // Average of left and above
                for i in 0..row_bytes {
                    let left = if i >= bpp {
                        current_row[i - bpp] as u16
                    } else {
                        0
                    };
                    let above = prev_row[i] as u16;
                    current_row[i] = row_data[i].wrapping_add(((left + above) / 2) as u8);
                }
            }
            4 => {
                // Paeth
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    let above = prev_row[i];
                    let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                    let paeth = paeth_predictor(left, above, upper_left);
                    current_row[i] = row_data[i].wrapping_add(paeth);
                }
            }
            _ => {
                // Unknown filter byte, keep the row as-is
                current_row.copy_from_slice(row_data);
            }
        }

        result.extend_from_slice(&current_row);
        prev_row = current_row;
    }

    Ok(result)
}

/// Paeth predictor function used in PNG filtering.
const fn paeth_predictor(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

/// Undo TIFF predictor 2 (horizontal differencing).
///
/// Only 8-bit components are handled; sub-byte depths are passed through
/// unchanged, which is what the files in the wild that use predictor 2
/// need in practice.
fn tiff_predictor(
    data: &[u8],
    columns: usize,
    colors: usize,
    bits_per_component: usize,
) -> Result<Vec<u8>> {
    if bits_per_component != 8 {
        return Ok(data.to_vec());
    }
    let row_bytes = columns * colors;
    if row_bytes == 0 {
        return Ok(Vec::new());
    }

    let mut result = data.to_vec();
    for row in result.chunks_mut(row_bytes) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_up_rows_accumulate() {
        let data = [
            2, 1, 2, 3, 4, // row 1 (Up over zero row)
            2, 4, 3, 2, 1, // row 2 (Up)
        ];
        let out = apply_predictor(12, &data, 4, 1, 8).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 5, 5, 5, 5]);
    }

    #[test]
    fn png_sub_uses_left_neighbour() {
        let data = [1, 10, 1, 1, 1];
        let out = apply_predictor(11, &data, 4, 1, 8).unwrap();
        assert_eq!(out, [10, 11, 12, 13]);
    }

    #[test]
    fn png_none_passthrough() {
        let data = [0, 9, 8, 7, 6];
        let out = apply_predictor(10, &data, 4, 1, 8).unwrap();
        assert_eq!(out, [9, 8, 7, 6]);
    }

    #[test]
    fn paeth_picks_nearest() {
        assert_eq!(paeth_predictor(1, 1, 1), 1);
        assert_eq!(paeth_predictor(10, 20, 15), 10);
        assert_eq!(paeth_predictor(1, 255, 200), 1);
    }

    #[test]
    fn tiff_horizontal_differencing() {
        // Two rows of 4 columns, 1 color: deltas accumulate per row
        let data = [10, 1, 1, 1, 20, 2, 2, 2];
        let out = apply_predictor(2, &data, 4, 1, 8).unwrap();
        assert_eq!(out, [10, 11, 12, 13, 20, 22, 24, 26]);
    }

    #[test]
    fn unknown_predictor_is_an_error() {
        assert!(apply_predictor(7, &[], 1, 1, 8).is_err());
    }
}
