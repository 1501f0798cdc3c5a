//! Number formatting for labels and table cells.

/// `1234567.8` → `"1,234,568"` with the given number of decimals.
pub fn thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }
    // half away from zero; `format!` alone rounds half to even
    let scale = 10f64.powi(decimals as i32);
    let formatted = format!("{:.*}", decimals, (value.abs() * scale).round() / scale);
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `1234.5` → `"$1,235"`.
pub fn currency(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let body = thousands(value.abs(), decimals);
    if value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-${body}")
    } else {
        format!("${body}")
    }
}

/// `0.1234` → `"12.3%"`; with `signed`, positive values get a `+`.
pub fn percent(value: f64, decimals: usize, signed: bool) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let pct = value * 100.0;
    if signed {
        format!("{:+.*}%", decimals, pct)
    } else {
        format!("{:.*}%", decimals, pct)
    }
}

/// `12_345.0` → `"$12.3K"`.
pub fn currency_k(value: f64) -> String {
    format!("${:.1}K", value / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(thousands(1234567.8, 0), "1,234,568");
        assert_eq!(thousands(999.0, 0), "999");
        assert_eq!(thousands(1000.5, 2), "1,000.50");
        assert_eq!(thousands(-4321.0, 0), "-4,321");
        assert_eq!(thousands(-0.2, 0), "0");
    }

    #[test]
    fn halves_round_away_from_zero() {
        assert_eq!(thousands(0.5, 0), "1");
        assert_eq!(thousands(2.5, 0), "3");
        assert_eq!(thousands(-2.5, 0), "-3");
        assert_eq!(thousands(0.125, 2), "0.13");
        assert_eq!(currency(1234.5, 0), "$1,235");
    }

    #[test]
    fn currency_and_percent() {
        assert_eq!(currency(1234.5, 0), "$1,235");
        assert_eq!(currency(-20.0, 0), "-$20");
        assert_eq!(percent(0.1234, 1, false), "12.3%");
        assert_eq!(percent(0.05, 1, true), "+5.0%");
        assert_eq!(percent(-0.05, 1, true), "-5.0%");
        assert_eq!(currency_k(12_345.0), "$12.3K");
        assert_eq!(currency(f64::NAN, 0), "");
    }
}
