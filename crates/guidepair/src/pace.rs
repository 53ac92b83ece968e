//! Running pace: minutes and seconds per unit distance.
//!
//! A pace is optional everywhere it appears; absent pace is a normal state
//! and every helper here maps `None` to `None` rather than failing.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A pace such as `8:30` (eight and a half minutes per mile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pace {
    /// Whole minutes.
    pub minutes: u32,
    /// Seconds past the minute.
    pub seconds: u32,
}

impl Pace {
    /// Create a pace from minutes and seconds.
    #[must_use]
    pub const fn new(minutes: u32, seconds: u32) -> Self {
        Self { minutes, seconds }
    }

    /// Decimal minutes: `minutes + seconds / 60`.
    #[must_use]
    pub fn decimal_minutes(self) -> f64 {
        f64::from(self.minutes) + f64::from(self.seconds) / 60.0
    }

    /// Total seconds, used where exact comparisons matter.
    #[must_use]
    pub fn total_seconds(self) -> u64 {
        u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.minutes, self.seconds)
    }
}

fn pace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(\d{1,3}):([0-5]\d)\s*$").expect("valid pace regex"))
}

impl FromStr for Pace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidPace {
            input: s.to_string(),
        };
        let caps = pace_pattern().captures(s).ok_or_else(invalid)?;
        let minutes = caps[1].parse().map_err(|_| invalid())?;
        let seconds = caps[2].parse().map_err(|_| invalid())?;
        Ok(Self { minutes, seconds })
    }
}

/// Decimal minutes for an optional pace.
#[must_use]
pub fn to_decimal(pace: Option<Pace>) -> Option<f64> {
    pace.map(Pace::decimal_minutes)
}

/// `M:SS` rendering for an optional pace.
#[must_use]
pub fn format(pace: Option<Pace>) -> Option<String> {
    pace.map(|p| p.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_minutes() {
        assert!((Pace::new(9, 30).decimal_minutes() - 9.5).abs() < f64::EPSILON);
        assert!((Pace::new(8, 0).decimal_minutes() - 8.0).abs() < f64::EPSILON);
        assert!((Pace::new(7, 15).decimal_minutes() - 7.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_to_decimal_absent() {
        assert_eq!(to_decimal(None), None);
        assert_eq!(to_decimal(Some(Pace::new(11, 0))), Some(11.0));
    }

    #[test]
    fn test_format_pads_seconds() {
        assert_eq!(format(Some(Pace::new(8, 5))), Some("8:05".to_string()));
        assert_eq!(format(Some(Pace::new(12, 0))), Some("12:00".to_string()));
        assert_eq!(format(Some(Pace::new(9, 45))), Some("9:45".to_string()));
        assert_eq!(format(None), None);
    }

    #[test]
    fn test_total_seconds() {
        assert_eq!(Pace::new(10, 0).total_seconds(), 600);
        assert_eq!(Pace::new(8, 30).total_seconds(), 510);
    }

    #[test]
    fn test_parse() {
        assert_eq!("8:30".parse::<Pace>().unwrap(), Pace::new(8, 30));
        assert_eq!(" 12:05 ".parse::<Pace>().unwrap(), Pace::new(12, 5));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for input in ["", "8", "8:5", "8:60", "eight:30", "8:30:00", "-1:00"] {
            let err = input.parse::<Pace>().unwrap_err();
            assert!(matches!(err, Error::InvalidPace { .. }), "{input}");
        }
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&Pace::new(8, 30)).unwrap();
        assert_eq!(json, r#"{"minutes":8,"seconds":30}"#);
    }
}
