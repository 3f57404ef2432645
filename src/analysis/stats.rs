//! Small numeric helpers shared by the sales, feed and quote reports.
//!
//! Everything here works on `f64` slices and returns `None` where the
//! result is undefined (empty input, zero divisor) instead of `NaN`.

/// Sum of `values`.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(sum(values) / values.len() as f64)
    }
}

/// Smallest value, ignoring `NaN`.
pub fn min(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .reduce(f64::min)
}

/// Largest value, ignoring `NaN`.
pub fn max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .reduce(f64::max)
}

/// `part / whole`, `None` when `whole` is zero.
pub fn ratio(part: f64, whole: f64) -> Option<f64> {
    if whole == 0.0 {
        None
    } else {
        Some(part / whole)
    }
}

/// `part` as a percentage of `whole`; 0 when `whole` is zero.
pub fn percentage(part: f64, whole: f64) -> f64 {
    ratio(part, whole).map_or(0.0, |r| r * 100.0)
}

/// Round to two decimals (cents, percentage points).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is clamped to `[0, 100]`.
///
/// ```rust
/// use dataprobe::analysis::stats::percentile;
///
/// assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), Some(2.5));
/// assert_eq!(percentile(&[], 50.0), None);
/// ```
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Sample standard deviation (n - 1 denominator), `None` below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Average order value rounded to cents, `None` without orders.
pub fn average_order_value(total: f64, orders: u64) -> Option<f64> {
    ratio(total, orders as f64).map(round2)
}

/// Gross margin in percent, `None` when the sale price is not positive.
pub fn gross_margin(purchase: f64, sale: f64) -> Option<f64> {
    if sale <= 0.0 {
        None
    } else {
        Some((sale - purchase) / sale * 100.0)
    }
}

/// Margin estimate for products without a recorded purchase price.
///
/// Cheap items are assumed to carry a lower cost ratio: 40% below 50,
/// 50% below 200, 60% above.
pub fn estimated_margin(sale: f64) -> Option<f64> {
    let cost_ratio = if sale < 50.0 {
        0.4
    } else if sale < 200.0 {
        0.5
    } else {
        0.6
    };
    gross_margin(sale * cost_ratio, sale)
}

/// Parse a social-media counter such as `"1.2万"`, `"3千"`, `"15k"`.
///
/// Unparsable input counts as zero.
pub fn parse_count(raw: &str) -> u64 {
    let cleaned = raw.trim().replace(',', "");
    let text = cleaned.trim_end_matches('+');
    let (number, multiplier) = if let Some(n) = text.strip_suffix('万') {
        (n, 10_000.0)
    } else if let Some(n) = text.strip_suffix('千') {
        (n, 1_000.0)
    } else if let Some(n) = text.strip_suffix(['w', 'W']) {
        (n, 10_000.0)
    } else if let Some(n) = text.strip_suffix(['k', 'K']) {
        (n, 1_000.0)
    } else {
        (text, 1.0)
    };

    match number.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => (n * multiplier).round() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn average_order_value_fixture() {
        assert_eq!(average_order_value(8560.50, 32), Some(267.52));
        assert_eq!(average_order_value(100.0, 0), None);
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(mean(&[]), None);
        assert_eq!(min(&[]), None);
        assert_eq!(sample_std_dev(&[1.0]), None);
        assert_eq!(percentage(5.0, 0.0), 0.0);
    }

    #[test]
    fn std_dev_uses_sample_denominator() {
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138_089_935).abs() < 1e-6);
    }

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(25.0, 1.75)]
    #[case(100.0, 4.0)]
    #[case(150.0, 4.0)]
    fn percentile_interpolates(#[case] p: f64, #[case] expected: f64) {
        assert_eq!(percentile(&[4.0, 1.0, 3.0, 2.0], p), Some(expected));
    }

    #[rstest]
    #[case(30.0, 60.0)]
    #[case(100.0, 50.0)]
    #[case(500.0, 40.0)]
    fn estimated_margin_tiers(#[case] sale: f64, #[case] expected: f64) {
        let margin = estimated_margin(sale).unwrap();
        assert!((margin - expected).abs() < 1e-9);
    }

    #[test]
    fn gross_margin_requires_positive_sale() {
        assert_eq!(gross_margin(10.0, 0.0), None);
        assert_eq!(gross_margin(60.0, 100.0), Some(40.0));
    }

    #[rstest]
    #[case("1.2万", 12_000)]
    #[case("3千", 3_000)]
    #[case("15k", 15_000)]
    #[case("2.5w", 25_000)]
    #[case("1,024", 1_024)]
    #[case("10万+", 100_000)]
    #[case("", 0)]
    #[case("lots", 0)]
    fn parse_count_suffixes(#[case] raw: &str, #[case] expected: u64) {
        assert_eq!(parse_count(raw), expected);
    }
}
