//! Query time bounds: unix timestamps or `YYYY-MM-DD HH:MM:SS` strings.
use crate::error::GillError;
use chrono::{LocalResult, NaiveDateTime, TimeZone};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A query time bound as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeInput {
    Unix(i64),
    Text(String),
}

impl TimeInput {
    /// Resolve to unix seconds.
    ///
    /// Text is parsed as `YYYY-MM-DD HH:MM:SS` in the local timezone. A time that does not exist
    /// or is ambiguous there (daylight saving transitions) is rejected. A string made only of
    /// digits is taken as a unix timestamp, which is what command line arguments look like.
    pub fn to_unix_seconds(&self) -> Result<i64, GillError> {
        match self {
            TimeInput::Unix(ts) => Ok(*ts),
            TimeInput::Text(text) => {
                let text = text.trim();
                if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
                    return text
                        .parse::<i64>()
                        .map_err(|_| GillError::InvalidTime(text.to_string()));
                }
                let naive = NaiveDateTime::parse_from_str(text, TIME_FORMAT)
                    .map_err(|_| GillError::InvalidTime(text.to_string()))?;
                match chrono::Local.from_local_datetime(&naive) {
                    LocalResult::Single(dt) => Ok(dt.timestamp()),
                    LocalResult::Ambiguous(_, _) | LocalResult::None => {
                        Err(GillError::InvalidTime(text.to_string()))
                    }
                }
            }
        }
    }
}

impl From<i64> for TimeInput {
    fn from(value: i64) -> Self {
        TimeInput::Unix(value)
    }
}

impl From<u32> for TimeInput {
    fn from(value: u32) -> Self {
        TimeInput::Unix(value as i64)
    }
}

impl From<i32> for TimeInput {
    fn from(value: i32) -> Self {
        TimeInput::Unix(value as i64)
    }
}

/// Fractional timestamps are truncated to whole seconds.
impl From<f64> for TimeInput {
    fn from(value: f64) -> Self {
        TimeInput::Unix(value.trunc() as i64)
    }
}

impl From<&str> for TimeInput {
    fn from(value: &str) -> Self {
        TimeInput::Text(value.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(value: String) -> Self {
        TimeInput::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_string_as_local_time() {
        let naive = NaiveDateTime::parse_from_str("2025-01-01 12:30:00", TIME_FORMAT).unwrap();
        let expected = chrono::Local
            .from_local_datetime(&naive)
            .single()
            .unwrap()
            .timestamp();
        let ts = TimeInput::from("2025-01-01 12:30:00").to_unix_seconds().unwrap();
        assert_eq!(ts, expected);

        // same wall clock time, shifted by the local offset from UTC
        let offset = chrono::Local
            .offset_from_local_datetime(&naive)
            .single()
            .unwrap();
        assert_eq!(ts, 1735734600 - offset.local_minus_utc() as i64);
    }

    #[test]
    fn test_numeric_inputs() {
        assert_eq!(TimeInput::from(1700000000i64).to_unix_seconds().unwrap(), 1700000000);
        assert_eq!(TimeInput::from(1700000000.9f64).to_unix_seconds().unwrap(), 1700000000);
        assert_eq!(TimeInput::from("1700000000").to_unix_seconds().unwrap(), 1700000000);
    }

    #[test]
    fn test_malformed_time() {
        for bad in ["", "2025-01-01", "2025-01-01T12:30:00", "01/01/2025 12:30:00", "now"] {
            assert!(
                matches!(TimeInput::from(bad).to_unix_seconds(), Err(GillError::InvalidTime(_))),
                "{bad} should be rejected"
            );
        }
    }
}
