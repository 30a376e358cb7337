//! Stream filter pipeline.
//!
//! Every decoder here is a pure function from bytes to bytes; nothing in
//! this module knows about objects, references or documents. The document
//! layer resolves `/Filter` and `/DecodeParms` and drives [`apply_filter`]
//! once per chained filter name, left to right.

pub mod ascii85;
pub mod flate;
pub mod lzw;
pub mod predictor;
pub mod runlength;

pub use ascii85::{ascii85_decode, asciihex_decode};
pub use flate::flate_decode;
pub use lzw::{lzw_decode, lzw_decode_with_earlychange};
pub use predictor::apply_predictor;
pub use runlength::rl_decode;

use crate::error::{PdfError, Result};
use crate::model::Dict;

/// Decode parameters relevant to the supported filters.
///
/// Missing keys take the defaults mandated by the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeParams {
    pub predictor: usize,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
    pub early_change: i64,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
            early_change: 1,
        }
    }
}

impl DecodeParams {
    /// Read parameters out of a (resolved) DecodeParms dictionary.
    pub fn from_dict(dict: Option<&Dict>) -> Self {
        let mut params = Self::default();
        let Some(dict) = dict else {
            return params;
        };
        if let Some(n) = dict.get("Predictor").and_then(|v| v.as_int().ok()) {
            params.predictor = n.max(0) as usize;
        }
        if let Some(n) = dict.get("Colors").and_then(|v| v.as_int().ok()) {
            params.colors = n.max(1) as usize;
        }
        if let Some(n) = dict.get("BitsPerComponent").and_then(|v| v.as_int().ok()) {
            params.bits_per_component = n.max(1) as usize;
        }
        if let Some(n) = dict.get("Columns").and_then(|v| v.as_int().ok()) {
            params.columns = n.max(1) as usize;
        }
        if let Some(n) = dict.get("EarlyChange").and_then(|v| v.as_int().ok()) {
            params.early_change = n;
        }
        params
    }
}

/// Apply a single named filter to raw bytes.
///
/// The abbreviated names are the inline-image forms; some generators use
/// them in regular stream dictionaries as well. Predictor post-processing
/// applies to the compression filters only.
pub fn apply_filter(name: &str, data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match name {
        "FlateDecode" | "Fl" => {
            let decoded = flate_decode(data)?;
            apply_predictor(
                params.predictor,
                &decoded,
                params.columns,
                params.colors,
                params.bits_per_component,
            )
        }
        "LZWDecode" | "LZW" => {
            let decoded = lzw_decode_with_earlychange(data, params.early_change)?;
            apply_predictor(
                params.predictor,
                &decoded,
                params.columns,
                params.colors,
                params.bits_per_component,
            )
        }
        "ASCII85Decode" | "A85" => ascii85_decode(data),
        "ASCIIHexDecode" | "AHx" => asciihex_decode(data),
        "RunLengthDecode" | "RL" => rl_decode(data),
        other => Err(PdfError::UnsupportedFilter(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PdfObject;

    #[test]
    fn params_from_dict_with_defaults() {
        let mut dict = Dict::new();
        dict.insert("Predictor".to_string(), PdfObject::Int(12));
        dict.insert("Columns".to_string(), PdfObject::Int(5));
        let params = DecodeParams::from_dict(Some(&dict));
        assert_eq!(params.predictor, 12);
        assert_eq!(params.columns, 5);
        assert_eq!(params.colors, 1);
        assert_eq!(params.bits_per_component, 8);
        assert_eq!(params.early_change, 1);
    }

    #[test]
    fn unknown_filter_is_reported_by_name() {
        let err = apply_filter("DCTDecode", b"", &DecodeParams::default()).unwrap_err();
        assert!(err.to_string().contains("DCTDecode"));
    }
}
