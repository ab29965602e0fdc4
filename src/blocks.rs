//! Text block reconstruction from PDF content streams
//!
//! lopdf exposes no block-level text API, so this module rebuilds one:
//! positioned spans are read off each page's content stream, grouped into
//! lines, and lines merged into rectangular blocks with a bounding box and
//! joined text. Stream order is preserved throughout; only spans within a
//! single line are re-sorted left to right.

use crate::PdfError;
use log::{debug, warn};
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Width of a US Letter page in points, used when no MediaBox is present.
const DEFAULT_PAGE_WIDTH: f32 = 612.0;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Tunables for grouping positioned spans into blocks.
#[derive(Debug, Clone)]
pub struct BlockConfig {
    /// Baseline tolerance for two spans to share a line, in points (default: 3.0)
    pub line_tolerance: f32,
    /// Maximum baseline gap between consecutive lines of one block,
    /// as a multiple of the line's font size (default: 1.8)
    pub block_gap_factor: f32,
    /// Horizontal gap splitting a line into separate blocks (a column
    /// gutter), as a fraction of page width (default: 0.2)
    pub column_gap_ratio: f32,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 3.0,
            block_gap_factor: 1.8,
            column_gap_ratio: 0.2,
        }
    }
}

/// A rectangular run of text on a page.
///
/// Coordinates are in PDF user space with the origin at the bottom-left,
/// so `y1` is the top edge and `y0` the bottom. Lines within the block are
/// joined with `\n` in `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub text: String,
}

/// A positioned show-operator result, before any grouping.
#[derive(Debug, Clone)]
struct Span {
    text: String,
    /// X of the text origin on the page
    x: f32,
    /// Baseline Y (PDF coordinates, origin at bottom-left)
    y: f32,
    /// Effective (matrix-scaled) font size
    font_size: f32,
}

impl Span {
    fn right_edge(&self) -> f32 {
        self.x + estimate_advance(&self.text, self.font_size)
    }
}

/// Approximate advance width at half an em per character.
/// lopdf does not expose glyph widths.
fn estimate_advance(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * 0.5
}

/// Spans sharing a baseline on one side of any column gutter.
#[derive(Debug)]
struct Line {
    spans: Vec<Span>,
    y: f32,
}

impl Line {
    fn new(spans: Vec<Span>) -> Self {
        let y = spans[0].y;
        Line { spans, y }
    }

    fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn font_size(&self) -> f32 {
        self.spans.iter().map(|s| s.font_size).fold(0.0, f32::max)
    }

    fn x0(&self) -> f32 {
        self.spans.iter().map(|s| s.x).fold(f32::INFINITY, f32::min)
    }

    fn x1(&self) -> f32 {
        self.spans
            .iter()
            .map(Span::right_edge)
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Reconstruct the ordered text blocks of a single page.
pub(crate) fn page_blocks(
    doc: &Document,
    page_id: ObjectId,
    page_number: u32,
    width: f32,
    config: &BlockConfig,
) -> Result<Vec<TextBlock>, PdfError> {
    let spans = page_spans(doc, page_id)?;
    let span_count = spans.len();

    let lines = group_spans_into_lines(spans, width, config);
    let blocks = group_lines_into_blocks(lines, config);

    debug!(
        "page {}: {} spans -> {} blocks",
        page_number,
        span_count,
        blocks.len()
    );

    Ok(blocks)
}

/// Resolve the page width from its MediaBox, following the Parent chain
/// for inherited boxes. Falls back to US Letter width when absent.
pub(crate) fn page_width(doc: &Document, page_id: ObjectId) -> f32 {
    match media_box(doc, page_id) {
        Some(rect) => (rect[2] - rect[0]).abs(),
        None => {
            debug!("no MediaBox for page {:?}, assuming US Letter", page_id);
            DEFAULT_PAGE_WIDTH
        }
    }
}

fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let mut current = page_id;
    // Parent chains are shallow; the bound guards against reference cycles
    for _ in 0..32 {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(obj) = dict.get(b"MediaBox") {
            return rect_values(doc, obj);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn rect_values(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let resolved = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let array = resolved.as_array().ok()?;
    if array.len() < 4 {
        return None;
    }
    Some([
        get_number(&array[0])?,
        get_number(&array[1])?,
        get_number(&array[2])?,
        get_number(&array[3])?,
    ])
}

/// Graphics and text state tracked while walking a content stream.
struct TextState {
    ctm: [f32; 6],
    ctm_stack: Vec<[f32; 6]>,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    font: String,
    font_size: f32,
    in_text: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font: String::new(),
            font_size: 12.0,
            in_text: false,
        }
    }
}

impl TextState {
    /// Advance to the next text line, approximating the leading from the
    /// current font size.
    fn next_line(&mut self) {
        self.line_matrix[5] -= self.font_size * 1.2;
        self.text_matrix = self.line_matrix;
    }
}

/// Walk a page's content stream and collect one span per show operator
/// (Tj, TJ, ' and "), in stream order.
fn page_spans(doc: &Document, page_id: ObjectId) -> Result<Vec<Span>, PdfError> {
    use lopdf::content::Content;

    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();
    let content_data = doc.get_page_content(page_id)?;
    let content = Content::decode(&content_data)?;

    let mut state = TextState::default();
    let mut spans = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => state.ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(saved) = state.ctm_stack.pop() {
                    state.ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let m = [
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    ];
                    state.ctm = multiply_matrices(&m, &state.ctm);
                }
            }
            "BT" => {
                state.in_text = true;
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "ET" => state.in_text = false,
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        state.font = String::from_utf8_lossy(name).to_string();
                    }
                    if let Ok(size) = op.operands[1].as_f32() {
                        state.font_size = size;
                    } else if let Ok(size) = op.operands[1].as_i64() {
                        state.font_size = size as f32;
                    }
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    state.line_matrix[4] += get_number(&op.operands[0]).unwrap_or(0.0);
                    state.line_matrix[5] += get_number(&op.operands[1]).unwrap_or(0.0);
                    state.text_matrix = state.line_matrix;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    for (i, operand) in op.operands.iter().take(6).enumerate() {
                        state.text_matrix[i] =
                            get_number(operand).unwrap_or(if i == 0 || i == 3 { 1.0 } else { 0.0 });
                    }
                    state.line_matrix = state.text_matrix;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(operand) = op.operands.first() {
                    if let Some(text) = decode_show_operand(operand, doc, &fonts, &state.font) {
                        emit_span(&mut spans, &state, text);
                    }
                }
            }
            "TJ" => {
                if let Some(Ok(array)) = op.operands.first().map(|o| o.as_array()) {
                    let mut combined = String::new();
                    for item in array {
                        if let Some(text) = decode_show_operand(item, doc, &fonts, &state.font) {
                            combined.push_str(&text);
                        }
                    }
                    emit_span(&mut spans, &state, combined);
                }
            }
            "'" => {
                state.next_line();
                if let Some(operand) = op.operands.first() {
                    if let Some(text) = decode_show_operand(operand, doc, &fonts, &state.font) {
                        emit_span(&mut spans, &state, text);
                    }
                }
            }
            "\"" => {
                // Operands are word spacing, char spacing, then the string
                state.next_line();
                if let Some(operand) = op.operands.get(2) {
                    if let Some(text) = decode_show_operand(operand, doc, &fonts, &state.font) {
                        emit_span(&mut spans, &state, text);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(spans)
}

fn emit_span(spans: &mut Vec<Span>, state: &TextState, text: String) {
    if !state.in_text || text.trim().is_empty() {
        return;
    }
    let device = multiply_matrices(&state.text_matrix, &state.ctm);
    spans.push(Span {
        text,
        x: device[4],
        y: device[5],
        font_size: effective_font_size(state.font_size, &state.text_matrix),
    });
}

/// Group spans into lines. Consecutive spans whose baselines agree within
/// the tolerance share a line; each line is then sorted left to right and
/// split wherever the horizontal gap exceeds the column gutter width, so
/// text on the far side of a gutter never joins a left-column line.
fn group_spans_into_lines(spans: Vec<Span>, width: f32, config: &BlockConfig) -> Vec<Line> {
    let mut runs: Vec<Vec<Span>> = Vec::new();

    for span in spans {
        let same_line = runs
            .last()
            .and_then(|run| run.first())
            .map_or(false, |first| {
                (first.y - span.y).abs() < config.line_tolerance
            });

        if same_line {
            runs.last_mut().unwrap().push(span);
        } else {
            runs.push(vec![span]);
        }
    }

    let gutter = width * config.column_gap_ratio;
    let mut lines = Vec::new();

    for mut run in runs {
        run.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let mut current: Vec<Span> = Vec::new();
        for span in run {
            if let Some(prev) = current.last() {
                if span.x - prev.right_edge() > gutter {
                    lines.push(Line::new(std::mem::take(&mut current)));
                }
            }
            current.push(span);
        }
        if !current.is_empty() {
            lines.push(Line::new(current));
        }
    }

    lines
}

/// Merge consecutive lines into blocks. Lines stay together while their
/// baseline gap is within `block_gap_factor` font sizes and their
/// horizontal extents overlap; anything else starts a new block.
fn group_lines_into_blocks(lines: Vec<Line>, config: &BlockConfig) -> Vec<TextBlock> {
    let mut runs: Vec<Vec<Line>> = Vec::new();

    for line in lines {
        let same_block = runs.last().and_then(|run| run.last()).map_or(false, |prev| {
            let gap = (prev.y - line.y).abs();
            gap <= config.block_gap_factor * prev.font_size().max(line.font_size())
                && line.x0() <= prev.x1()
                && line.x1() >= prev.x0()
        });

        if same_block {
            runs.last_mut().unwrap().push(line);
        } else {
            runs.push(vec![line]);
        }
    }

    runs.iter().map(|run| block_from_lines(run)).collect()
}

fn block_from_lines(lines: &[Line]) -> TextBlock {
    let mut x0 = f32::INFINITY;
    let mut y0 = f32::INFINITY;
    let mut x1 = f32::NEG_INFINITY;
    let mut y1 = f32::NEG_INFINITY;

    for span in lines.iter().flat_map(|l| l.spans.iter()) {
        x0 = x0.min(span.x);
        y0 = y0.min(span.y);
        x1 = x1.max(span.right_edge());
        y1 = y1.max(span.y + span.font_size);
    }

    let text = lines.iter().map(Line::text).collect::<Vec<_>>().join("\n");

    TextBlock { x0, y0, x1, y1, text }
}

/// Multiply two 2D transformation matrices in `[a, b, c, d, e, f]` form.
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Compute the effective font size from the base size and the text matrix
/// scale factors.
fn effective_font_size(base_size: f32, text_matrix: &[f32; 6]) -> f32 {
    let scale_x = (text_matrix[0].powi(2) + text_matrix[1].powi(2)).sqrt();
    let scale_y = (text_matrix[2].powi(2) + text_matrix[3].powi(2)).sqrt();
    base_size * scale_x.max(scale_y)
}

fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Decode a show-operator string operand through the page's font encoding,
/// with UTF-16BE and Latin-1 fallbacks.
fn decode_show_operand(
    obj: &Object,
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    current_font: &str,
) -> Option<String> {
    if let Object::String(bytes, _) = obj {
        if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return Some(text);
                }
            }
            warn!("raw byte fallback for font {:?}", current_font);
        }

        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            return Some(String::from_utf16_lossy(&utf16));
        }

        // Latin-1 fallback
        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f32 = 600.0;

    fn span(text: &str, x: f32, y: f32, font_size: f32) -> Span {
        Span {
            text: text.to_string(),
            x,
            y,
            font_size,
        }
    }

    fn blocks_of(spans: Vec<Span>) -> Vec<TextBlock> {
        let config = BlockConfig::default();
        group_lines_into_blocks(group_spans_into_lines(spans, WIDTH, &config), &config)
    }

    #[test]
    fn test_spans_on_one_baseline_form_a_line() {
        let spans = vec![
            span("World", 160.0, 700.0, 12.0),
            span("Hello", 100.0, 701.0, 12.0),
            span("Next", 100.0, 680.0, 12.0),
        ];
        let lines = group_spans_into_lines(spans, WIDTH, &BlockConfig::default());
        assert_eq!(lines.len(), 2);
        // Spans within a line are re-sorted left to right
        assert_eq!(lines[0].text(), "Hello World");
        assert_eq!(lines[1].text(), "Next");
    }

    #[test]
    fn test_gutter_gap_splits_a_baseline() {
        // 72..96 and 400..448: the 304pt gap exceeds 20% of page width
        let spans = vec![
            span("left", 72.0, 700.0, 12.0),
            span("right", 400.0, 700.0, 12.0),
        ];
        let blocks = blocks_of(spans);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "left");
        assert_eq!(blocks[1].text, "right");
    }

    #[test]
    fn test_adjacent_lines_merge_into_one_block() {
        let spans = vec![
            span("first line", 100.0, 700.0, 12.0),
            span("second line", 100.0, 686.0, 12.0),
        ];
        let blocks = blocks_of(spans);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "first line\nsecond line");
    }

    #[test]
    fn test_wide_gap_starts_a_new_block() {
        let spans = vec![
            span("heading", 100.0, 700.0, 12.0),
            span("body", 100.0, 600.0, 12.0),
        ];
        let blocks = blocks_of(spans);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "heading");
        assert_eq!(blocks[1].text, "body");
    }

    #[test]
    fn test_side_by_side_columns_stay_separate() {
        // Interleaved emission of two columns sharing baselines
        let spans = vec![
            span("q one", 72.0, 700.0, 12.0),
            span("a one", 400.0, 700.0, 12.0),
            span("q two", 72.0, 686.0, 12.0),
            span("a two", 400.0, 686.0, 12.0),
        ];
        let blocks = blocks_of(spans);
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].text, "q one");
        assert_eq!(blocks[1].text, "a one");
        assert_eq!(blocks[2].text, "q two");
        assert_eq!(blocks[3].text, "a two");
    }

    #[test]
    fn test_block_bbox_covers_all_spans() {
        let spans = vec![
            span("abcd", 100.0, 700.0, 12.0),
            span("ab", 90.0, 686.0, 12.0),
        ];
        let blocks = blocks_of(spans);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.x0, 90.0);
        assert_eq!(block.y0, 686.0);
        // 100 + 4 chars * 12pt * 0.5
        assert_eq!(block.x1, 124.0);
        assert_eq!(block.y1, 712.0);
    }

    #[test]
    fn test_stream_order_is_preserved() {
        // A footer emitted before the body stays first
        let spans = vec![
            span("footer", 100.0, 40.0, 10.0),
            span("body", 100.0, 700.0, 12.0),
        ];
        let blocks = blocks_of(spans);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "footer");
        assert_eq!(blocks[1].text, "body");
    }

    #[test]
    fn test_estimate_advance_is_half_an_em_per_char() {
        assert_eq!(estimate_advance("Hello", 12.0), 30.0);
        assert_eq!(estimate_advance("", 12.0), 0.0);
    }

    #[test]
    fn test_effective_font_size_scales_with_matrix() {
        let doubled = [2.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        assert_eq!(effective_font_size(12.0, &doubled), 24.0);
        assert_eq!(effective_font_size(12.0, &IDENTITY), 12.0);
    }
}
