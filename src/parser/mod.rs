pub mod blocks;
pub mod extract;
pub mod html;
pub mod lines;

pub use extract::ExtractionOutcome;

use extract::BlockContext;

/// Knobs the source system never converged on: some screens zero-pad the
/// article column and some do not, and the code width of the block anchor
/// varies between report layouts.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub keep_leading_zeros: bool,
    pub anchor_width: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { keep_leading_zeros: false, anchor_width: 6 }
    }
}

/// Full pipeline for one capture: content → lines → blocks → validated
/// records. Pure given its inputs; zero records is a normal outcome, never
/// an error.
pub fn process_capture(
    content: &str,
    product: &str,
    captured_at: &str,
    options: &ParseOptions,
) -> ExtractionOutcome {
    let flattened;
    let content = if html::looks_like_html(content) {
        flattened = html::flatten(content);
        flattened.as_str()
    } else {
        content
    };

    let anchor = lines::anchor_pattern(options.anchor_width);
    let classified = lines::classify_lines(content, &anchor);
    let product_blocks = blocks::segment(&classified, product);
    let ctx = BlockContext { captured_at, options };

    let mut outcome = ExtractionOutcome {
        blocks: product_blocks.len(),
        ..Default::default()
    };
    for block in &product_blocks {
        let extracted = extract::extract_block(block, &ctx);
        outcome.skipped_markers += extracted.skipped_markers;
        for record in extracted.records {
            if record.is_valid() {
                outcome.records.push(record);
            } else {
                tracing::warn!(
                    article = %record.article,
                    forecast = %record.forecast,
                    "invalid record dropped"
                );
                outcome.invalid_records += 1;
            }
        }
    }
    outcome
}

// ── Tests ──
