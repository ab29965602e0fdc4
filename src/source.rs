//! Page access abstraction
//!
//! The left-column filter only needs a page's width and its ordered text
//! blocks. [`PageSource`] narrows the PDF dependency to exactly that, so
//! the filter can run against synthetic pages in tests while [`LopdfSource`]
//! serves real documents.

use crate::blocks::{self, BlockConfig, TextBlock};
use crate::PdfError;
use lopdf::{Document, ObjectId};
use std::collections::BTreeMap;

/// Resolved content of a single page.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page width in PDF user-space units
    pub width: f32,
    /// Text blocks in content-stream order
    pub blocks: Vec<TextBlock>,
}

/// Read access to a paged document.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Load one page by its 1-based number.
    ///
    /// Fails with [`PdfError::OutOfRange`] when the page does not exist.
    fn load_page(&self, page_number: u32) -> Result<PageContent, PdfError>;
}

/// Page source backed by a loaded [`lopdf::Document`].
///
/// The document is only read; the source keeps no per-call state, so
/// repeated loads of the same page return the same content.
pub struct LopdfSource {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    config: BlockConfig,
}

impl LopdfSource {
    pub fn new(doc: Document) -> Self {
        Self::with_config(doc, BlockConfig::default())
    }

    pub fn with_config(doc: Document, config: BlockConfig) -> Self {
        let pages = doc.get_pages();
        Self { doc, pages, config }
    }
}

impl PageSource for LopdfSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn load_page(&self, page_number: u32) -> Result<PageContent, PdfError> {
        let &page_id = self
            .pages
            .get(&page_number)
            .ok_or(PdfError::OutOfRange {
                requested: page_number,
                available: self.pages.len() as u32,
            })?;

        let width = blocks::page_width(&self.doc, page_id);
        Ok(PageContent {
            width,
            blocks: blocks::page_blocks(&self.doc, page_id, page_number, width, &self.config)?,
        })
    }
}
