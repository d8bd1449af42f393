//! # Assay Parser
//!
//! Document parsing boundary for the Assay pipeline. The byte-level PDF
//! extraction itself is a library concern consumed behind
//! [`assay_core::DocumentParser`]; this crate owns what sits above it:
//!
//! - **Content hashing**: stable BLAKE3 digest of the uploaded bytes, the
//!   dedup key for idempotent uploads
//! - **Chunking**: overlapping fixed-size text chunks for embedding
//! - **Page estimation**: mapping a chunk's character offset back to a page
//! - **Plain-text parsing**: a deterministic [`PlainTextParser`] used for
//!   text uploads and throughout the test suites

pub mod chunk;
pub mod plain_text;

pub use chunk::{chunk_text, estimate_page_number, TextChunk, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
pub use plain_text::PlainTextParser;

/// BLAKE3 hex digest of uploaded bytes. Identical bytes always hash
/// identically, which is what makes upload dedup sound.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
