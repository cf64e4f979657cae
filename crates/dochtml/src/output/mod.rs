//! Persisting conversion results

pub mod assembler;
pub mod assets;

pub use assembler::{DocumentMetadata, HtmlAssembler};
pub use assets::{sanitize_filename, AssetStore};
