use std::sync::LazyLock;

use regex::Regex;

use crate::record::Forecast;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d.,]+").unwrap());

/// One classified line of captured page text.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Product code plus the start of the description
    /// (`"000014 VELUDO CONFORT 001 TINTO"`). Opens a new block.
    Anchor { code: String, text: String },
    /// Forecast marker: immediate availability or an exact date.
    Marker(Forecast),
    /// At least three numeric tokens; candidate stock/orders/available triple.
    Values { text: String, tokens: Vec<String> },
    Text(String),
    Empty,
}

/// Anchor pattern: an `width`-digit product code followed by description
/// text. The width varies between screens of the source system, so it is
/// built per run instead of being a static.
pub fn anchor_pattern(width: usize) -> Regex {
    Regex::new(&format!(r"^(\d{{{width}}})\s+([A-Za-z].*)$")).unwrap()
}

pub fn classify_lines(content: &str, anchor: &Regex) -> Vec<Line> {
    content.lines().map(|l| classify_line(l, anchor)).collect()
}

fn classify_line(raw: &str, anchor: &Regex) -> Line {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Empty;
    }

    if let Some(caps) = anchor.captures(line) {
        return Line::Anchor {
            code: caps[1].to_string(),
            text: line.to_string(),
        };
    }

    // Marker before Values: a bare date line also tokenizes as three numbers.
    if let Some(forecast) = Forecast::parse(line) {
        return Line::Marker(forecast);
    }

    let tokens = numeric_tokens(line);
    if tokens.len() >= 3 {
        return Line::Values {
            text: line.to_string(),
            tokens,
        };
    }

    Line::Text(line.to_string())
}

/// Digit-bearing substrings of the form `[\d.,]+`, in order of appearance.
/// Pure separator runs (`"..."`) do not count.
pub fn numeric_tokens(line: &str) -> Vec<String> {
    NUMBER_RE
        .find_iter(line)
        .map(|m| m.as_str().to_string())
        .filter(|t| t.bytes().any(|b| b.is_ascii_digit()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(line: &str) -> Line {
        classify_line(line, &anchor_pattern(6))
    }

    #[test]
    fn anchor_line() {
        match classify("000014 VELUDO CONFORT 001 TINTO") {
            Line::Anchor { code, text } => {
                assert_eq!(code, "000014");
                assert_eq!(text, "000014 VELUDO CONFORT 001 TINTO");
            }
            other => panic!("expected anchor, got {:?}", other),
        }
    }

    #[test]
    fn anchor_needs_alphabetic_description() {
        // Six digits followed by more numbers is a value line, not an anchor.
        assert!(!matches!(classify("000014 123 456"), Line::Anchor { .. }));
    }

    #[test]
    fn anchor_width_is_configurable() {
        let eight = anchor_pattern(8);
        assert!(matches!(
            classify_line("00001234 VELUDO RIVIERA", &eight),
            Line::Anchor { .. }
        ));
        assert!(!matches!(
            classify_line("000014 VELUDO RIVIERA", &eight),
            Line::Anchor { .. }
        ));
    }

    #[test]
    fn marker_lines() {
        assert!(matches!(classify("Pronta entrega"), Line::Marker(Forecast::Immediate)));
        assert!(matches!(classify("19/01/2026"), Line::Marker(Forecast::Date { .. })));
    }

    #[test]
    fn date_line_is_marker_not_values() {
        // "19", "01", "2026" would tokenize as three numbers.
        assert!(matches!(classify("19/01/2026"), Line::Marker(_)));
    }

    #[test]
    fn value_triple_line() {
        match classify("16.605,30 16.605,30 0,00") {
            Line::Values { tokens, .. } => {
                assert_eq!(tokens, vec!["16.605,30", "16.605,30", "0,00"]);
            }
            other => panic!("expected values, got {:?}", other),
        }
    }

    #[test]
    fn two_numbers_is_text() {
        assert!(matches!(classify("Totais: 1.200,00 800,00"), Line::Text(_)));
    }

    #[test]
    fn blank_line() {
        assert!(matches!(classify("   "), Line::Empty));
    }

    #[test]
    fn tokens_keep_order_and_skip_separator_runs() {
        assert_eq!(
            numeric_tokens("a 1,5 ... 2.000 b 3"),
            vec!["1,5", "2.000", "3"]
        );
    }
}
