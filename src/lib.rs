//! Left-column text extraction from PDFs using lopdf
//!
//! This crate provides:
//! - Reconstruction of positioned text blocks from page content streams
//! - Filtering of blocks against a configurable left-region ratio
//! - A pluggable page source so the filter runs on synthetic data in tests
//!
//! The result maps each requested 1-based page number to that page's
//! left-column text, blocks trimmed and joined with newlines.

pub mod blocks;
pub mod extractor;
pub mod source;

pub use blocks::{BlockConfig, TextBlock};
pub use extractor::{extract_left_column, DEFAULT_LEFT_RATIO};
pub use source::{LopdfSource, PageContent, PageSource};

use lopdf::Document;
use std::collections::BTreeMap;
use std::path::Path;

/// Extract left-column text from a PDF file.
///
/// Opens the document, reconstructs each page's text blocks and returns the
/// joined left-column text for every page in `[start_page, end_page]`
/// (1-based, inclusive). See [`extract_left_column`] for the filtering
/// contract.
pub fn extract_left_column_from_file<P: AsRef<Path>>(
    path: P,
    start_page: u32,
    end_page: u32,
    left_ratio: f32,
) -> Result<BTreeMap<u32, String>, PdfError> {
    let doc = Document::load(path)?;
    extract_left_column(&LopdfSource::new(doc), start_page, end_page, left_ratio)
}

/// Extract left-column text from a PDF memory buffer.
pub fn extract_left_column_from_mem(
    buffer: &[u8],
    start_page: u32,
    end_page: u32,
    left_ratio: f32,
) -> Result<BTreeMap<u32, String>, PdfError> {
    let doc = Document::load_mem(buffer)?;
    extract_left_column(&LopdfSource::new(doc), start_page, end_page, left_ratio)
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid PDF document: {0}")]
    InvalidDocument(String),
    #[error("page {requested} out of range: document has {available} pages")]
    OutOfRange { requested: u32, available: u32 },
}

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::InvalidDocument(e.to_string())
    }
}
