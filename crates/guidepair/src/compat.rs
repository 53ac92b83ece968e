//! Pace compatibility between an athlete and a candidate guide.
//!
//! The score is advisory. It drives highlighting and accessible labels but
//! never blocks a pairing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pace::Pace;

/// How much slower a guide is than the athlete they would run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No concern: paces unknown, guide faster, or gap below the slight threshold.
    #[default]
    None,
    /// Guide is noticeably slower.
    Slight,
    /// Guide is much slower.
    Significant,
}

impl Severity {
    /// Suffix appended to a guide's accessible label, if any.
    #[must_use]
    pub fn label_suffix(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Slight => Some("slightly slower pace"),
            Self::Significant => Some("significantly slower pace"),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Slight => write!(f, "slight"),
            Self::Significant => write!(f, "significant"),
        }
    }
}

/// Thresholds, in decimal minutes, for the two pace regimes.
///
/// Athletes at or below `regime_cutoff_minutes` use the `fast_*` pair,
/// slower athletes use the `slow_*` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaceThresholds {
    /// Athlete pace separating the faster regime from the slower one.
    pub regime_cutoff_minutes: f64,
    /// Faster regime: gap at which a guide becomes slightly slower.
    pub fast_slight: f64,
    /// Faster regime: gap at which a guide becomes significantly slower.
    pub fast_significant: f64,
    /// Slower regime: gap at which a guide becomes slightly slower.
    pub slow_slight: f64,
    /// Slower regime: gap at which a guide becomes significantly slower.
    pub slow_significant: f64,
}

impl Default for PaceThresholds {
    fn default() -> Self {
        Self {
            regime_cutoff_minutes: 10.0,
            fast_slight: 0.5,
            fast_significant: 1.0,
            slow_slight: 1.0,
            slow_significant: 2.0,
        }
    }
}

impl PaceThresholds {
    /// Score a candidate guide against an athlete.
    ///
    /// Paces are compared in whole seconds so that gaps like `7:50` to `8:20`
    /// land exactly on the threshold instead of a hair either side of it.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn severity(&self, athlete: Option<Pace>, guide: Option<Pace>) -> Severity {
        let (Some(athlete), Some(guide)) = (athlete, guide) else {
            return Severity::None;
        };

        let athlete_secs = athlete.total_seconds();
        let guide_secs = guide.total_seconds();
        if guide_secs <= athlete_secs {
            return Severity::None;
        }
        let diff = (guide_secs - athlete_secs) as f64;

        let (slight, significant) = if athlete_secs as f64 <= self.regime_cutoff_minutes * 60.0 {
            (self.fast_slight, self.fast_significant)
        } else {
            (self.slow_slight, self.slow_significant)
        };

        if diff >= significant * 60.0 {
            Severity::Significant
        } else if diff >= slight * 60.0 {
            Severity::Slight
        } else {
            Severity::None
        }
    }
}

/// Score with the default thresholds.
#[must_use]
pub fn severity(athlete: Option<Pace>, guide: Option<Pace>) -> Severity {
    PaceThresholds::default().severity(athlete, guide)
}
