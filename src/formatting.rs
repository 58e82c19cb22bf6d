/// The spelled-out labels for the day counts that have one.
const DAY_LABELS: [&str; 7] = [
    "ONE DAY",
    "TWO DAYS",
    "THREE DAYS",
    "FOUR DAYS",
    "FIVE DAYS",
    "SIX DAYS",
    "SEVEN DAYS",
];

/// Map a number of shooting days to its uppercase English label.
///
/// Counts from one to seven are spelled out, every other value (zero and negative
/// counts included) falls back to `"<N> DAYS"`.
pub fn format_days_of_shoot(days: i64) -> String {
    match days {
        1..=7 => DAY_LABELS[(days - 1) as usize].to_string(),
        _ => format!("{days} DAYS"),
    }
}

/// The shortest text that reads back as the same quantity: `2` rather than `2.0`, `2.5` as is.
pub fn format_quantity(quantity: f64) -> String {
    format!("{quantity}")
}

/// Format an amount the way the en-IN locale does: the last three integer digits form a
/// group and the rest is grouped by two (`1,23,45,678`), with at most three fraction
/// digits and no trailing zeros.
pub fn format_amount(amount: f64) -> String {
    if !amount.is_finite() {
        return if amount.is_nan() {
            "NaN".to_string()
        } else if amount.is_sign_negative() {
            "-∞".to_string()
        } else {
            "∞".to_string()
        };
    }

    let thousandths = (amount.abs() * 1000.0).round() as u128;
    let whole = thousandths / 1000;
    let fraction = thousandths % 1000;

    let mut formatted = String::new();
    if amount.is_sign_negative() && thousandths > 0 {
        formatted.push('-');
    }
    formatted.push_str(&group_indian_digits(&whole.to_string()));
    if fraction > 0 {
        let fraction_digits = format!("{fraction:03}");
        formatted.push('.');
        formatted.push_str(fraction_digits.trim_end_matches('0'));
    }

    formatted
}

/// Insert the grouping separators into a string of ASCII digits.
fn group_indian_digits(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spelled_out_day_labels() {
        let labels: Vec<String> = (1..=7).map(format_days_of_shoot).collect();
        assert_eq!(
            labels,
            vec![
                "ONE DAY",
                "TWO DAYS",
                "THREE DAYS",
                "FOUR DAYS",
                "FIVE DAYS",
                "SIX DAYS",
                "SEVEN DAYS"
            ]
        );
    }

    #[test]
    fn out_of_table_days_fall_back_to_plural_numerals() {
        assert_eq!(format_days_of_shoot(9), "9 DAYS");
        assert_eq!(format_days_of_shoot(0), "0 DAYS");
        assert_eq!(format_days_of_shoot(-1), "-1 DAYS");
    }

    #[test]
    fn amounts_use_indian_grouping() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(2500.0), "2,500");
        assert_eq!(format_amount(150000.0), "1,50,000");
        assert_eq!(format_amount(12345678.0), "1,23,45,678");
        assert_eq!(format_amount(-45000.0), "-45,000");
    }

    #[test]
    fn amounts_keep_at_most_three_fraction_digits() {
        assert_eq!(format_amount(1234.5), "1,234.5");
        assert_eq!(format_amount(0.1 + 0.2), "0.3");
        assert_eq!(format_amount(10.12349), "10.123");
        assert_eq!(format_amount(-0.0001), "0");
    }

    #[test]
    fn quantities_drop_a_zero_fraction() {
        assert_eq!(format_quantity(2.0), "2");
        assert_eq!(format_quantity(2.5), "2.5");
    }
}
