//! Document structure - xref sections and the document façade.

pub mod catalog;
pub mod xref;

pub use catalog::{Document, ParseOptions};
pub use xref::{XRef, XRefEntry};
