//! folio - a PDF object-graph reading library.
//!
//! Reads PDF files directly from bytes: tokenizes the object syntax,
//! rebuilds the object graph, resolves indirect references through the
//! cross-reference index (classic tables, xref streams, incremental
//! updates) and decodes stream filters. Damaged files degrade to a
//! full-file scan instead of failing to open.
//!
//! Content-stream interpretation, fonts, rendering and decryption are
//! consumers of this crate, not parts of it.

pub mod codec;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;

pub use document::{Document, ParseOptions, XRefEntry};
pub use error::{PdfError, Result};
pub use model::{Dict, ObjRef, PdfObject, PdfStream};
