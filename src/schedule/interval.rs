//! Interval Expressions
//!
//! Compact durations such as `1h30m5s`. Every component is optional but at
//! least one must be present, they must appear in hour, minute, second
//! order, and numerals may not start with a zero.

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use super::ScheduleError;

/// Hours, minutes and seconds, each optional and free of leading zeros
const INTERVAL_PATTERN: &str = r"^(?:([1-9][0-9]*)h)?(?:([1-9][0-9]*)m)?(?:([1-9][0-9]*)s)?$";

/// Seconds per unit, in capture group order
const UNIT_SECONDS: [u64; 3] = [3600, 60, 1];

fn interval_regex() -> Result<&'static Regex, ScheduleError> {
    static INTERVAL_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    INTERVAL_RE
        .get_or_init(|| Regex::new(INTERVAL_PATTERN))
        .as_ref()
        .map_err(|e| ScheduleError::ScheduleFailed(format!("interval pattern: {}", e)))
}

/// Split `text` into `(numeral, unit_seconds)` pairs
fn components(text: &str) -> Result<Vec<(&str, u64)>, ScheduleError> {
    let invalid = || ScheduleError::InvalidFormat(text.to_string());
    let caps = interval_regex()?.captures(text).ok_or_else(invalid)?;

    let parts: Vec<_> = UNIT_SECONDS
        .iter()
        .enumerate()
        .filter_map(|(i, &seconds)| caps.get(i + 1).map(|m| (m.as_str(), seconds)))
        .collect();
    if parts.is_empty() {
        return Err(invalid());
    }
    Ok(parts)
}

/// Check `text` against the interval grammar
pub fn validate_interval(text: &str) -> Result<(), ScheduleError> {
    components(text).map(|_| ())
}

/// Convert a valid interval expression to a [`Duration`]
///
/// Well-formed expressions too large to represent fail with
/// [`ScheduleError::ScheduleFailed`].
pub fn parse_interval(text: &str) -> Result<Duration, ScheduleError> {
    let parts = components(text)?;
    let overflow = || ScheduleError::ScheduleFailed(format!("interval {:?} is out of range", text));

    let mut total: u64 = 0;
    for (numeral, unit) in parts {
        let amount: u64 = numeral.parse().map_err(|_| overflow())?;
        total = amount
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(overflow)?;
    }

    Ok(Duration::from_secs(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_intervals() {
        for text in ["1h", "30m", "5s", "1h30m", "1h5s", "30m5s", "1h30m5s", "10s", "120m"] {
            assert!(validate_interval(text).is_ok(), "{} should be valid", text);
        }
    }

    #[test]
    fn test_invalid_intervals() {
        for text in [
            "", "00h", "0s", "01m", "h", "1", "1x", "1s1m", "1h1h", "1m1h", " 1s", "1s ", "-1s",
            "1.5s", "1H", "1s\n", "\u{0661}s",
        ] {
            assert!(
                matches!(validate_interval(text), Err(ScheduleError::InvalidFormat(_))),
                "{:?} should be invalid",
                text
            );
        }
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("4s").unwrap(), Duration::from_secs(4));
        assert_eq!(parse_interval("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_interval("1h30m5s").unwrap(), Duration::from_secs(5405));
        assert_eq!(parse_interval("90s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_parse_interval_errors() {
        assert!(matches!(parse_interval("0s"), Err(ScheduleError::InvalidFormat(_))));
        assert!(matches!(
            parse_interval("99999999999999999999h"),
            Err(ScheduleError::ScheduleFailed(_))
        ));
        assert!(matches!(
            parse_interval("9999999999999999h"),
            Err(ScheduleError::ScheduleFailed(_))
        ));
    }
}
