//! Object model - the PDF value space.

pub mod objects;

pub use objects::{Dict, ObjRef, PdfObject, PdfStream};
