//! Brazilian-convention numeric handling: `.` for thousands, `,` for decimals.
//!
//! The source system renders quantities this way and the downstream report
//! tooling expects the same convention back, so normalization canonicalizes
//! the string form instead of converting to a machine number. [`parse_value`]
//! exists only for aggregation.

/// Canonicalize a quantity string to two decimals (`"16.605,30"`).
/// Total: anything unparseable comes back as `"0,00"`.
pub fn normalize_value(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return "0,00".to_string();
    }

    // Everything before the last comma is the integer part, dots are
    // thousands separators. No comma means a whole number.
    let (int_raw, dec_raw) = match s.rfind(',') {
        Some(idx) => (&s[..idx], &s[idx + 1..]),
        None => (s, ""),
    };

    let int_digits: String = int_raw.chars().filter(|c| *c != '.').collect();
    if !int_digits.bytes().all(|b| b.is_ascii_digit())
        || !dec_raw.bytes().all(|b| b.is_ascii_digit())
    {
        return "0,00".to_string();
    }

    let mut dec: String = dec_raw.chars().take(2).collect();
    while dec.len() < 2 {
        dec.push('0');
    }
    let int_part = if int_digits.is_empty() {
        "0".to_string()
    } else {
        int_digits
    };

    format!("{},{}", group_thousands(&int_part), dec)
}

/// Read a normalized (or raw Brazilian) value back as a float. Used for
/// totals only; the persisted representation stays the string form.
pub fn parse_value(s: &str) -> f64 {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

fn group_thousands(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(*b as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_number_gets_decimals() {
        assert_eq!(normalize_value("1234"), "1.234,00");
        assert_eq!(normalize_value("5"), "5,00");
    }

    #[test]
    fn thousands_round_trip() {
        assert_eq!(normalize_value("16.605,30"), "16.605,30");
        assert_eq!(normalize_value("16605,30"), "16.605,30");
    }

    #[test]
    fn decimal_pad_and_truncate() {
        assert_eq!(normalize_value("1,5"), "1,50");
        assert_eq!(normalize_value("1,"), "1,00");
        assert_eq!(normalize_value("1,567"), "1,56");
    }

    #[test]
    fn unparseable_is_zero() {
        assert_eq!(normalize_value(""), "0,00");
        assert_eq!(normalize_value("   "), "0,00");
        assert_eq!(normalize_value("abc"), "0,00");
        assert_eq!(normalize_value("12a,30"), "0,00");
        assert_eq!(normalize_value("1,2x"), "0,00");
    }

    #[test]
    fn bare_separators() {
        assert_eq!(normalize_value(","), "0,00");
        assert_eq!(normalize_value("."), "0,00");
        assert_eq!(normalize_value(",50"), "0,50");
    }

    #[test]
    fn idempotent() {
        for input in ["16.605,30", "1234", "0,1", "abc", "", "8.221,40", ",5"] {
            let once = normalize_value(input);
            assert_eq!(normalize_value(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn total_output_shape() {
        let shape = regex::Regex::new(r"^\d+(\.\d{3})*,\d{2}$").unwrap();
        for input in [
            "", " ", "x", "1", "12", "123", "1234", "12345", "1.2", "1,2,3",
            "16.605,30", "0,00", "999.999.999,99", ",,", "..", "1..2,3",
        ] {
            let out = normalize_value(input);
            assert!(shape.is_match(&out), "input {:?} gave {:?}", input, out);
        }
    }

    #[test]
    fn parse_back_for_totals() {
        assert_eq!(parse_value("16.605,30"), 16605.30);
        assert_eq!(parse_value("0,00"), 0.0);
        assert_eq!(parse_value("nope"), 0.0);
    }
}
