/// Last vintage whose tract identifiers may arrive truncated to four digits.
pub const LEGACY_TRACT_YEAR: u16 = 2009;

/// Normalize a fixed-width identifier to `width` characters.
///
/// Identifiers are left-padded with zeros, except pre-2010 tracts of at most four
/// digits, which lost their two-digit suffix and are right-padded instead.
/// Values that arrive as floats (`"1.0"`) lose the fractional part first.
pub fn normalize_id(value: &str, width: usize, level: &str, year: u16) -> String {
    let value = value.trim();
    let value = match value.split_once('.') {
        Some((whole, frac)) if !whole.is_empty() && frac.bytes().all(|b| b == b'0') => whole,
        _ => value,
    };

    if level == "tract" && year <= LEGACY_TRACT_YEAR && value.len() <= 4 {
        format!("{value:0<width$}")
    } else {
        format!("{value:0>width$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_pads_to_width() {
        assert_eq!(normalize_id("1", 2, "state", 2020), "01");
        assert_eq!(normalize_id(" 36 ", 2, "state", 2020), "36");
        assert_eq!(normalize_id("5", 3, "county", 2020), "005");
        assert_eq!(normalize_id("100", 6, "tract", 2020), "000100");
    }

    #[test]
    fn legacy_tracts_right_pad() {
        assert_eq!(normalize_id("1234", 6, "tract", 2000), "123400");
        assert_eq!(normalize_id("12", 6, "tract", 2009), "120000");
        assert_eq!(normalize_id("123456", 6, "tract", 2000), "123456");
        // only tracts are affected
        assert_eq!(normalize_id("12", 3, "county", 2000), "012");
    }

    #[test]
    fn float_formatted_ids() {
        assert_eq!(normalize_id("1.0", 2, "state", 2020), "01");
        assert_eq!(normalize_id("36.00", 2, "state", 2020), "36");
        assert_eq!(normalize_id("1.5", 3, "county", 2020), "1.5");
    }
}
