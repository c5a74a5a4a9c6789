//! Cell value parsing for statistical-agency tables.

/// Placeholders the agency uses for withheld or unreliable cells.
const SUPPRESSION_TOKENS: &[&str] = &["x", "X", "F", ".."];

/// Parses a raw cell into a count.
///
/// Blank cells, suppression codes (`x`, `X`, `F`, `..`), and anything that
/// is not a non-negative integer after removing thousands separators all
/// yield `None`. Suppressed values are never coerced to zero.
#[must_use]
pub fn parse_count(raw: Option<&str>) -> Option<u64> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || SUPPRESSION_TOKENS.contains(&trimmed) {
        return None;
    }

    trimmed.replace(',', "").parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_digits() {
        assert_eq!(parse_count(Some("500")), Some(500));
        assert_eq!(parse_count(Some("0")), Some(0));
    }

    #[test]
    fn strips_thousands_separators() {
        assert_eq!(parse_count(Some("12,345")), Some(12_345));
        assert_eq!(parse_count(Some(" 1,000,000 ")), Some(1_000_000));
    }

    #[test]
    fn suppression_codes_are_absent() {
        for token in ["x", "X", "F", ".."] {
            assert_eq!(parse_count(Some(token)), None, "token {token}");
        }
    }

    #[test]
    fn blank_and_missing_are_absent() {
        assert_eq!(parse_count(None), None);
        assert_eq!(parse_count(Some("")), None);
        assert_eq!(parse_count(Some("   ")), None);
    }

    #[test]
    fn garbage_is_absent() {
        for raw in ["abc", "12a", "1.5", "-5", "--", "f", "\u{2014}", "1,2,3x"] {
            assert_eq!(parse_count(Some(raw)), None, "input {raw:?}");
        }
    }

    #[test]
    fn reparsing_a_parsed_count_is_stable() {
        for raw in ["1,234", "42", "0"] {
            let parsed = parse_count(Some(raw)).unwrap();
            assert_eq!(parse_count(Some(&parsed.to_string())), Some(parsed));
        }
    }
}
