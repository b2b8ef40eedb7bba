use crate::error::{Error, Result};

/// Parses a free-form duration token such as `2h`, `90m`, `1.5hour` or `2`
/// into whole seconds. A bare number is read as hours. Zero and negative
/// results are rejected.
pub fn parse_interval(input: &str) -> Result<u64> {
    let token = input.trim().to_lowercase();
    let invalid = || Error::InvalidInterval(input.trim().to_owned());

    let split = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(token.len());
    let (number, unit) = token.split_at(split);

    if !is_decimal(number) {
        return Err(invalid());
    }
    let value: f64 = number.parse().map_err(|_| invalid())?;

    let multiplier = match unit.trim_start() {
        "" | "h" | "hr" | "hour" => 3600.0,
        "m" | "min" | "minute" => 60.0,
        _ => return Err(invalid()),
    };

    let seconds = (value * multiplier).trunc();
    if !seconds.is_finite() || seconds < 1.0 || seconds > u64::MAX as f64 {
        return Err(invalid());
    }

    Ok(seconds as u64)
}

/// Renders an interval the way operators typed it.
pub fn format_interval(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds} seconds")
    } else if seconds < 3600 {
        format!("{:.1} minutes", seconds as f64 / 60.0)
    } else {
        format!("{:.1} hours", seconds as f64 / 3600.0)
    }
}

// digits, at most one dot, at least one digit after the dot
fn is_decimal(number: &str) -> bool {
    let mut parts = number.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    match parts.next() {
        Some(fraction) => {
            !fraction.is_empty()
                && fraction.bytes().all(|b| b.is_ascii_digit())
                && whole.bytes().all(|b| b.is_ascii_digit())
        }
        None => !whole.is_empty() && whole.bytes().all(|b| b.is_ascii_digit()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hours_and_minutes() {
        assert_eq!(parse_interval("2h").unwrap(), 7200);
        assert_eq!(parse_interval("90m").unwrap(), 5400);
        assert_eq!(parse_interval("1.5h").unwrap(), 5400);
        assert_eq!(parse_interval("2").unwrap(), 7200);
        assert_eq!(parse_interval(" 30 MIN ").unwrap(), 1800);
        assert_eq!(parse_interval("2hr").unwrap(), 7200);
        assert_eq!(parse_interval("1 hour").unwrap(), 3600);
        assert_eq!(parse_interval("5minute").unwrap(), 300);
        assert_eq!(parse_interval(".5h").unwrap(), 1800);
    }

    #[test]
    fn truncates_to_whole_seconds() {
        assert_eq!(parse_interval("1.0001m").unwrap(), 60);
        assert_eq!(parse_interval("1.99999m").unwrap(), 119);
        assert_eq!(parse_interval("0.5m").unwrap(), 30);
        assert_eq!(
            parse_interval("0.01m").unwrap_err().to_string(),
            "invalid interval '0.01m'"
        );
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["abc", "", "h", "2d", "1.", "1..5h", "-2h", "0", "0m", "2 hours"] {
            assert!(
                matches!(parse_interval(bad), Err(Error::InvalidInterval(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn formats_for_display() {
        assert_eq!(format_interval(45), "45 seconds");
        assert_eq!(format_interval(1800), "30.0 minutes");
        assert_eq!(format_interval(5400), "1.5 hours");
    }
}
