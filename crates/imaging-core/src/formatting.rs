/// Placeholder shown wherever a derived value is not available.
pub const NOT_AVAILABLE: &str = "NA";

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use imaging_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by half an ULP at the target precision so exact midpoints such as
    // 1.005 round away from zero.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();
    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        // "0.50" → ".50"
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a service or beneficiary count with thousands separators.
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Format an optional value, rendering `None` as [`NOT_AVAILABLE`].
///
/// ```
/// use imaging_core::formatting::format_optional;
///
/// assert_eq!(format_optional(Some(1.25), 2), "1.25");
/// assert_eq!(format_optional(None, 2), "NA");
/// ```
pub fn format_optional(value: Option<f64>, decimals: u32) -> String {
    match value {
        Some(v) => format_number(v, decimals),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Format a percentage with one decimal place and a `%` suffix.
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_number(value, 1))
}

/// Short axis label for a power-of-ten-ish magnitude: `1K`, `10K`, `2.5M`.
///
/// ```
/// use imaging_core::formatting::format_compact;
///
/// assert_eq!(format_compact(100.0), "100");
/// assert_eq!(format_compact(10_000.0), "10K");
/// assert_eq!(format_compact(2_500_000.0), "2.5M");
/// ```
pub fn format_compact(value: f64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e9, "B"), (1e6, "M"), (1e3, "K")];
    let abs_value = value.abs();
    for (scale, suffix) in UNITS {
        if abs_value >= scale {
            return format!("{}{}", trim_decimal(value / scale), suffix);
        }
    }
    trim_decimal(value)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// One decimal place at most, without a trailing `.0`.
fn trim_decimal(value: f64) -> String {
    let s = format!("{:.1}", value);
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_234_567.0, 0), "1,234,567");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
    }

    #[test]
    fn test_format_number_negative_rounds_to_zero() {
        assert_eq!(format_number(-0.001, 2), "0.00");
    }

    #[test]
    fn test_format_number_rounds_up() {
        assert_eq!(format_number(1.005, 2), "1.01");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(12_345_678), "12,345,678");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(0.125), 3), "0.125");
        assert_eq!(format_optional(None, 3), NOT_AVAILABLE);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(33.333), "33.3%");
        assert_eq!(format_percent(100.0), "100.0%");
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(1.0), "1");
        assert_eq!(format_compact(1_000.0), "1K");
        assert_eq!(format_compact(100_000.0), "100K");
        assert_eq!(format_compact(1_000_000.0), "1M");
        assert_eq!(format_compact(10_000_000.0), "10M");
        assert_eq!(format_compact(0.5), "0.5");
    }
}
