use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::normalize_value;
use crate::record::{format_article, Forecast, StockRecord, IMMEDIATE_TOKEN};

use super::super::blocks::{ProductBlock, SCAN_WINDOW};
use super::super::lines::{numeric_tokens, Line};
use super::{BlockContext, StrategyOutcome};

static DATE_ANYWHERE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}/\d{2}/\d{4})").unwrap());

/// Classifier-strict pairing: each marker line claims the first value triple
/// that follows it, up to the next marker, the end of the block, or the scan
/// window. A marker with no triple in reach is skipped and counted.
pub fn strict(block: &ProductBlock, ctx: &BlockContext) -> StrategyOutcome {
    let markers: Vec<(usize, Forecast)> = block
        .lines
        .iter()
        .enumerate()
        .filter_map(|(i, l)| match l {
            Line::Marker(f) => Some((i, *f)),
            _ => None,
        })
        .collect();

    if markers.is_empty() {
        return StrategyOutcome { matched: false, records: Vec::new(), skipped_markers: 0 };
    }

    let description = description_before(block, markers[0].0);
    let mut records = Vec::new();
    let mut skipped = 0;

    for (i, (pos, forecast)) in markers.iter().enumerate() {
        let end = markers
            .get(i + 1)
            .map(|(next, _)| *next)
            .unwrap_or(block.lines.len())
            .min(pos + 1 + SCAN_WINDOW);

        match first_triple(&block.lines[pos + 1..end]) {
            Some(values) => {
                records.push(build_record(block, ctx, &description, &forecast.to_string(), values));
            }
            None => {
                tracing::warn!(
                    code = %block.code,
                    forecast = %forecast,
                    "marker without value triple; skipped"
                );
                skipped += 1;
            }
        }
    }

    StrategyOutcome { matched: true, records, skipped_markers: skipped }
}

/// Fallback for pages that wrap the date in prose (`"previsto para
/// 19/01/2026"`) or render it on the same line as the quantities. Only
/// reached when the block holds no strict marker.
pub fn loose_date(block: &ProductBlock, ctx: &BlockContext) -> StrategyOutcome {
    let hits: Vec<(usize, &str, Forecast)> = block
        .lines
        .iter()
        .enumerate()
        .filter_map(|(i, l)| {
            let text = match l {
                Line::Text(t) => t.as_str(),
                Line::Values { text, .. } => text.as_str(),
                _ => return None,
            };
            let m = DATE_ANYWHERE_RE.find(text)?;
            let forecast = Forecast::parse(m.as_str())?;
            Some((i, text, forecast))
        })
        .collect();

    if hits.is_empty() {
        return StrategyOutcome { matched: false, records: Vec::new(), skipped_markers: 0 };
    }

    let description = description_before(block, hits[0].0);
    let mut records = Vec::new();
    let mut skipped = 0;

    for (i, (pos, text, forecast)) in hits.iter().enumerate() {
        // Quantities on the marker line itself win; the date is cut out so
        // its digit groups cannot pose as the triple.
        let own_line = {
            let without_date = DATE_ANYWHERE_RE.replace(text, " ");
            let tokens = numeric_tokens(&without_date);
            (tokens.len() >= 3).then(|| normalize_triple(&tokens))
        };

        let end = hits
            .get(i + 1)
            .map(|(next, _, _)| *next)
            .unwrap_or(block.lines.len())
            .min(pos + 1 + SCAN_WINDOW);

        match own_line.or_else(|| first_triple(&block.lines[pos + 1..end])) {
            Some(values) => {
                records.push(build_record(block, ctx, &description, &forecast.to_string(), values));
            }
            None => {
                tracing::warn!(
                    code = %block.code,
                    forecast = %forecast,
                    "loose date without value triple; skipped"
                );
                skipped += 1;
            }
        }
    }

    StrategyOutcome { matched: true, records, skipped_markers: skipped }
}

/// Last resort: no marker of any kind, but the block does carry a value
/// triple. The source renders such blocks when everything is in stock, so
/// the forecast defaults to the immediate-availability token. One record.
pub fn implied_immediate(block: &ProductBlock, ctx: &BlockContext) -> StrategyOutcome {
    let triple_pos = block
        .lines
        .iter()
        .position(|l| matches!(l, Line::Values { tokens, .. } if tokens.len() >= 3));

    let Some(pos) = triple_pos else {
        return StrategyOutcome { matched: false, records: Vec::new(), skipped_markers: 0 };
    };

    let values = match &block.lines[pos] {
        Line::Values { tokens, .. } => normalize_triple(tokens),
        _ => unreachable!("position() matched a Values line"),
    };
    let description = description_before(block, pos);
    let record = build_record(block, ctx, &description, IMMEDIATE_TOKEN, values);

    StrategyOutcome { matched: true, records: vec![record], skipped_markers: 0 }
}

// ── Shared pieces ──

/// First line with at least three numeric tokens, normalized positionally:
/// stock, orders, available. The columns carry no labels on the page, so
/// order is the contract.
fn first_triple(lines: &[Line]) -> Option<[String; 3]> {
    lines.iter().find_map(|l| match l {
        Line::Values { tokens, .. } if tokens.len() >= 3 => Some(normalize_triple(tokens)),
        _ => None,
    })
}

fn normalize_triple(tokens: &[String]) -> [String; 3] {
    [
        normalize_value(&tokens[0]),
        normalize_value(&tokens[1]),
        normalize_value(&tokens[2]),
    ]
}

/// Description text accumulated between the block's anchor and its first
/// marker, whitespace collapsed. Falls back to the product code when the
/// block opens directly with a marker.
fn description_before(block: &ProductBlock, first_marker: usize) -> String {
    let parts: Vec<&str> = block.lines[..first_marker]
        .iter()
        .filter_map(|l| match l {
            Line::Anchor { text, .. } => Some(text.as_str()),
            Line::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect();

    let joined = parts.join(" ");
    let collapsed: Vec<&str> = joined.split_whitespace().collect();
    if collapsed.is_empty() {
        block.code.clone()
    } else {
        collapsed.join(" ")
    }
}

fn build_record(
    block: &ProductBlock,
    ctx: &BlockContext,
    description: &str,
    forecast: &str,
    [stock, orders, available]: [String; 3],
) -> StockRecord {
    StockRecord {
        article: format_article(&block.code, ctx.options.keep_leading_zeros),
        captured_at: ctx.captured_at.to_string(),
        description: description.to_string(),
        forecast: forecast.to_string(),
        stock,
        orders,
        available,
    }
}
