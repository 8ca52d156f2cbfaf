/// Parses a human-formatted count such as `"3,400"`, `"1.2k"` or `"2M"`.
///
/// Thousands separators and surrounding whitespace are ignored, a trailing
/// `k`/`m` multiplies by one thousand/million, and any fractional remainder
/// is truncated. Anything that isn't a number yields `0`.
pub fn parse_count(text: &str) -> u64 {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let (digits, multiplier) = match cleaned.as_bytes().last() {
        Some(b'k') => (&cleaned[..cleaned.len() - 1], 1_000),
        Some(b'm') => (&cleaned[..cleaned.len() - 1], 1_000_000),
        _ => (cleaned.as_str(), 1),
    };

    scale_decimal(digits, multiplier).unwrap_or(0)
}

/// Multiplies a non-negative decimal literal by `multiplier` without going
/// through floating point, so `"45.6"` × 1000 is exactly 45600.
fn scale_decimal(digits: &str, multiplier: u64) -> Option<u64> {
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().ok()?
    };
    let mut total = whole_value.checked_mul(multiplier)?;

    // Only as many fractional digits as the multiplier can resolve matter.
    let mut scale = multiplier;
    for digit in fraction.bytes() {
        scale /= 10;
        if scale == 0 {
            break;
        }
        total = total.checked_add(u64::from(digit - b'0') * scale)?;
    }

    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(parse_count("42"), 42);
        assert_eq!(parse_count("  7 "), 7);
    }

    #[test]
    fn test_parse_thousands_separator() {
        assert_eq!(parse_count("1,234"), 1234);
        assert_eq!(parse_count("12,345,678"), 12_345_678);
    }

    #[test]
    fn test_parse_k_suffix() {
        assert_eq!(parse_count("2.5k"), 2500);
        assert_eq!(parse_count("1.2k"), 1200);
        assert_eq!(parse_count("45.6k"), 45_600);
        assert_eq!(parse_count("10K"), 10_000);
    }

    #[test]
    fn test_parse_m_suffix() {
        assert_eq!(parse_count("3m"), 3_000_000);
        assert_eq!(parse_count("1.25M"), 1_250_000);
    }

    #[test]
    fn test_fraction_is_truncated() {
        assert_eq!(parse_count("12.9"), 12);
        assert_eq!(parse_count("1.2345k"), 1234);
        assert_eq!(parse_count(".5k"), 500);
    }

    #[test]
    fn test_unparseable_input_is_zero() {
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("garbage"), 0);
        assert_eq!(parse_count("k"), 0);
        assert_eq!(parse_count("."), 0);
        assert_eq!(parse_count("-5"), 0);
        assert_eq!(parse_count("1.2.3"), 0);
        assert_eq!(parse_count("★ 12"), 0);
    }

    #[test]
    fn test_overflow_is_zero() {
        assert_eq!(parse_count("99999999999999999999m"), 0);
    }
}
