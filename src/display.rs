use crate::state::UNKNOWN_NUMBER;

pub fn format_ball(number: i32) -> String {
    if number == UNKNOWN_NUMBER {
        return "?".to_string();
    }
    format!("{number:02}")
}

pub fn format_balls(numbers: &[i32]) -> String {
    numbers
        .iter()
        .map(|n| format_ball(*n))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jackpot headline value, e.g. `45.3 Tỷ`.
pub fn format_billions(value: Option<u64>) -> String {
    match value {
        Some(v) => format!("{:.1} Tỷ", v as f64 / 1_000_000_000.0),
        None => "...".to_string(),
    }
}

/// Table value in millions with grouped thousands, e.g. `30.000M`.
pub fn format_millions(value: Option<u64>) -> String {
    match value {
        Some(v) if v > 0 => format!("{}M", group_thousands(v / 1_000_000)),
        _ => "---".to_string(),
    }
}

pub fn format_amount(value: Option<u64>) -> String {
    match value {
        Some(v) if v > 0 => group_thousands(v),
        _ => "---".to_string(),
    }
}

/// Prize value with its winner count, as shown in the history table.
pub fn format_prize_tier(value: Option<u64>, winners: u32) -> String {
    format!("{} x{winners}", format_amount(value))
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

/// Groups with `.` the way the backend's locale prints money.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balls_are_zero_padded_and_sentinel_is_masked() {
        assert_eq!(format_balls(&[3, 17, UNKNOWN_NUMBER]), "03 17 ?");
    }

    #[test]
    fn money_formats() {
        assert_eq!(format_billions(Some(45_300_000_000)), "45.3 Tỷ");
        assert_eq!(format_billions(None), "...");
        assert_eq!(format_millions(Some(30_000_000_000)), "30.000M");
        assert_eq!(format_millions(Some(0)), "---");
        assert_eq!(format_amount(Some(10_000_000)), "10.000.000");
        assert_eq!(group_thousands(999), "999");
    }

    #[test]
    fn prize_tiers_show_value_and_winners() {
        assert_eq!(format_prize_tier(Some(10_000_000), 12), "10.000.000 x12");
        assert_eq!(format_prize_tier(None, 0), "--- x0");
    }
}
