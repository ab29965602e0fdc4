//! Left-column filtering over a page source
//!
//! A block belongs to the left column when its right edge lies within a
//! configurable fraction of the page width. Everything else about a page's
//! content (block geometry, ordering) comes from the [`PageSource`].

use crate::source::PageSource;
use crate::PdfError;
use log::debug;
use std::collections::BTreeMap;

/// Fraction of page width treated as the left column by default.
pub const DEFAULT_LEFT_RATIO: f32 = 0.4;

/// Extract the left-column text of every page in `[start_page, end_page]`.
///
/// Page bounds are 1-based and inclusive. For each page, blocks whose right
/// edge satisfies `x1 <= width * left_ratio` are kept in source order (no
/// vertical re-sort), each block's text is trimmed independently, and the
/// results joined with a newline. Every requested page appears in the
/// returned mapping, with the empty string when nothing qualifies.
///
/// A `left_ratio` of zero or below selects nothing on a page of nonzero
/// width; a ratio of one or above selects every block.
///
/// Extraction is all-or-nothing: a page the source cannot resolve fails the
/// whole call with [`PdfError::OutOfRange`] and no partial mapping is
/// returned.
pub fn extract_left_column<S: PageSource>(
    source: &S,
    start_page: u32,
    end_page: u32,
    left_ratio: f32,
) -> Result<BTreeMap<u32, String>, PdfError> {
    let mut result = BTreeMap::new();

    for page_number in start_page..=end_page {
        let page = source.load_page(page_number)?;
        let threshold = page.width * left_ratio;

        let selected: Vec<&str> = page
            .blocks
            .iter()
            .filter(|block| block.x1 <= threshold)
            .map(|block| block.text.trim())
            .collect();

        debug!(
            "page {}: kept {} of {} blocks at x1 <= {:.1}",
            page_number,
            selected.len(),
            page.blocks.len(),
            threshold
        );

        result.insert(page_number, selected.join("\n"));
    }

    Ok(result)
}
