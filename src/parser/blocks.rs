use super::lines::Line;

/// Bounded lookahead when pairing a marker with its value line. Keeps the
/// scan over a malformed page from walking arbitrarily far.
pub const SCAN_WINDOW: usize = 25;

/// A contiguous run of lines describing one product/color/pattern/variant
/// combination and its forecast entries. Transient: consumed by the
/// extractor, never persisted.
#[derive(Debug, Clone)]
pub struct ProductBlock {
    /// Code from the anchor line, or the queried product for implicit blocks.
    pub code: String,
    /// Line offset of the block start within the capture, for diagnostics.
    pub start: usize,
    pub lines: Vec<Line>,
}

/// Partition classified lines into product blocks. A block opens at each
/// anchor line and runs to the next anchor or end of input, so every line
/// lands in exactly one block. Pages that never repeat the product code get
/// a single implicit block attributed to the queried product; the same
/// applies to preamble lines before the first anchor.
pub fn segment(lines: &[Line], queried_code: &str) -> Vec<ProductBlock> {
    let mut blocks: Vec<ProductBlock> = Vec::new();
    let mut code = queried_code.to_string();
    let mut start = 0usize;
    let mut current: Vec<Line> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if let Line::Anchor { code: anchor_code, .. } = line {
            if !current.is_empty() {
                blocks.push(ProductBlock {
                    code: std::mem::replace(&mut code, anchor_code.clone()),
                    start,
                    lines: std::mem::take(&mut current),
                });
            } else {
                code = anchor_code.clone();
            }
            start = idx;
        }
        current.push(line.clone());
    }

    if !current.is_empty() || blocks.is_empty() {
        blocks.push(ProductBlock { code, start, lines: current });
    }

    blocks
}
