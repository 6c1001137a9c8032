use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Literal the source system renders for immediate availability.
pub const IMMEDIATE_TOKEN: &str = "Pronta entrega";

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap());

/// A classified forecast marker: ready stock now, or a future calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forecast {
    Immediate,
    Date { day: u32, month: u32, year: u32 },
}

impl Forecast {
    /// Strict line classifier: the exact immediate-availability token
    /// (case-insensitive) or a line that is exactly `DD/MM/YYYY`. Calendar
    /// validity is deliberately not checked; the page is trusted to render
    /// what the ERP holds, month `13` included.
    pub fn parse(line: &str) -> Option<Forecast> {
        let line = line.trim();
        if line.eq_ignore_ascii_case(IMMEDIATE_TOKEN) {
            return Some(Forecast::Immediate);
        }
        if DATE_RE.is_match(line) {
            return Some(Forecast::Date {
                day: line[0..2].parse().ok()?,
                month: line[3..5].parse().ok()?,
                year: line[6..10].parse().ok()?,
            });
        }
        None
    }

    /// Immediate availability sorts before any calendar date; dates sort
    /// chronologically, not lexically.
    pub fn sort_key(&self) -> (u32, u32, u32) {
        match *self {
            Forecast::Immediate => (0, 0, 0),
            Forecast::Date { day, month, year } => (year, month, day),
        }
    }
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Forecast::Immediate => f.write_str(IMMEDIATE_TOKEN),
            Forecast::Date { day, month, year } => {
                write!(f, "{:02}/{:02}/{:04}", day, month, year)
            }
        }
    }
}

/// One persisted stock row: product identity, forecast horizon and the
/// stock/orders/available triple in normalized Brazilian string form.
/// Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StockRecord {
    pub article: String,
    pub captured_at: String,
    pub description: String,
    pub forecast: String,
    pub stock: String,
    pub orders: String,
    pub available: String,
}

impl StockRecord {
    /// Validation gate every row passes before persistence. Kept independent
    /// of the extractor so rows arriving from older record files are checked
    /// the same way.
    pub fn is_valid(&self) -> bool {
        let article_ok =
            !self.article.is_empty() && self.article.bytes().all(|b| b.is_ascii_digit());
        let forecast = self.forecast.trim();
        let forecast_ok =
            forecast.eq_ignore_ascii_case(IMMEDIATE_TOKEN) || DATE_RE.is_match(forecast);
        article_ok
            && forecast_ok
            && has_digit(&self.stock)
            && has_digit(&self.orders)
            && has_digit(&self.available)
    }

    /// Ordering key for the forecast column; unparseable forecasts sort last.
    pub fn forecast_key(&self) -> (u32, u32, u32) {
        Forecast::parse(&self.forecast)
            .map(|f| f.sort_key())
            .unwrap_or((u32::MAX, u32::MAX, u32::MAX))
    }
}

fn has_digit(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
}

/// Article codes arrive zero-padded (`"000014"`); reports use the bare
/// number. Stripping is configurable because different screens of the source
/// system disagree about padding.
pub fn format_article(code: &str, keep_leading_zeros: bool) -> String {
    let code = code.trim();
    if keep_leading_zeros {
        return code.to_string();
    }
    let stripped = code.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StockRecord {
        StockRecord {
            article: "14".into(),
            captured_at: "2026-01-15 08:30:00".into(),
            description: "000014 VELUDO CONFORT 001 TINTO".into(),
            forecast: "Pronta entrega".into(),
            stock: "16.605,30".into(),
            orders: "16.605,30".into(),
            available: "0,00".into(),
        }
    }

    #[test]
    fn classify_immediate_any_case() {
        assert_eq!(Forecast::parse("Pronta entrega"), Some(Forecast::Immediate));
        assert_eq!(Forecast::parse("PRONTA ENTREGA"), Some(Forecast::Immediate));
        assert_eq!(Forecast::parse("  pronta entrega  "), Some(Forecast::Immediate));
    }

    #[test]
    fn classify_exact_date() {
        assert_eq!(
            Forecast::parse("19/01/2026"),
            Some(Forecast::Date { day: 19, month: 1, year: 2026 })
        );
    }

    #[test]
    fn classify_does_not_check_calendar() {
        // Month 13 never existed, but the classifier only checks shape.
        assert_eq!(
            Forecast::parse("01/13/2024"),
            Some(Forecast::Date { day: 1, month: 13, year: 2024 })
        );
    }

    #[test]
    fn substring_dates_are_not_markers() {
        assert_eq!(Forecast::parse("entrega em 19/01/2026"), None);
        assert_eq!(Forecast::parse("19/01/2026 confirmado"), None);
        assert_eq!(Forecast::parse("VELUDO CONFORT"), None);
    }

    #[test]
    fn forecast_ordering() {
        let immediate = Forecast::Immediate.sort_key();
        let feb_2025 = Forecast::Date { day: 1, month: 2, year: 2025 }.sort_key();
        let jan_2026 = Forecast::Date { day: 15, month: 1, year: 2026 }.sort_key();
        assert!(immediate < feb_2025);
        assert!(feb_2025 < jan_2026, "chronological, not lexical");
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(Forecast::Immediate.to_string(), "Pronta entrega");
        assert_eq!(
            Forecast::Date { day: 19, month: 1, year: 2026 }.to_string(),
            "19/01/2026"
        );
    }

    #[test]
    fn valid_record_passes() {
        assert!(record().is_valid());
    }

    #[test]
    fn empty_article_rejected() {
        let mut r = record();
        r.article = "".into();
        assert!(!r.is_valid());
    }

    #[test]
    fn non_numeric_article_rejected() {
        let mut r = record();
        r.article = "14A".into();
        assert!(!r.is_valid());
    }

    #[test]
    fn bad_forecast_rejected() {
        let mut r = record();
        r.forecast = "not-a-date".into();
        assert!(!r.is_valid());
    }

    #[test]
    fn digitless_value_rejected() {
        let mut r = record();
        r.stock = "---".into();
        assert!(!r.is_valid());
    }

    #[test]
    fn article_stripping() {
        assert_eq!(format_article("000014", false), "14");
        assert_eq!(format_article("014", false), "14");
        assert_eq!(format_article("000", false), "0");
        assert_eq!(format_article("000014", true), "000014");
    }
}
