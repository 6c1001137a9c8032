pub mod strategies;

use crate::record::StockRecord;

use super::blocks::ProductBlock;
use super::ParseOptions;

/// Per-capture result handed back to the caller. There is no shared
/// extraction state anywhere; every invocation owns its own outcome.
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub records: Vec<StockRecord>,
    pub blocks: usize,
    pub skipped_markers: usize,
    pub invalid_records: usize,
}

pub struct BlockContext<'a> {
    pub captured_at: &'a str,
    pub options: &'a ParseOptions,
}

/// What one strategy made of a block. `matched` means the strategy
/// recognized the block's shape and owns the result, even when every marker
/// it saw had to be skipped; later strategies then stay out of the way.
pub struct StrategyOutcome {
    pub matched: bool,
    pub records: Vec<StockRecord>,
    pub skipped_markers: usize,
}

impl StrategyOutcome {
    fn unmatched() -> Self {
        StrategyOutcome { matched: false, records: Vec::new(), skipped_markers: 0 }
    }
}

type Strategy = fn(&ProductBlock, &BlockContext) -> StrategyOutcome;

/// Ordered fallback chain. Strict marker pairing first; a date buried in
/// longer text only counts when no strict marker exists; a block with bare
/// value lines and no marker at all is read as implied immediate
/// availability.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("strict", strategies::strict),
    ("loose-date", strategies::loose_date),
    ("implied-immediate", strategies::implied_immediate),
];

pub fn extract_block(block: &ProductBlock, ctx: &BlockContext) -> StrategyOutcome {
    for (name, strategy) in STRATEGIES {
        let outcome = strategy(block, ctx);
        if outcome.matched {
            tracing::debug!(
                strategy = name,
                code = %block.code,
                records = outcome.records.len(),
                skipped = outcome.skipped_markers,
                "block extracted"
            );
            return outcome;
        }
    }
    StrategyOutcome::unmatched()
}
