//! Soft plausibility checks on parsed samples.
//!
//! Issues are reported, never enforced: a sample with issues is still usable.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::models::Sample;

pub const MIN_POWER_DBM: f64 = -150.0;
pub const MAX_POWER_DBM: f64 = 50.0;
pub const MAX_TIMESTAMP_DRIFT_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    InvertedRange { start_mhz: f64, end_mhz: f64 },
    PowerOutOfRange { count: usize },
    /// Every bin reports the same power; typical of a stuck device
    FlatSpectrum { power: f64 },
    TimestampDrift { hours: i64 },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::InvertedRange { start_mhz, end_mhz } => {
                write!(f, "inverted frequency range {start_mhz}-{end_mhz} MHz")
            }
            ValidationIssue::PowerOutOfRange { count } => write!(
                f,
                "{count} power value(s) outside [{MIN_POWER_DBM}, {MAX_POWER_DBM}] dBm"
            ),
            ValidationIssue::FlatSpectrum { power } => {
                write!(f, "all power values identical ({power} dBm)")
            }
            ValidationIssue::TimestampDrift { hours } => {
                write!(f, "timestamp drifted {hours}h from wall clock")
            }
        }
    }
}

/// Check a sample against wall-clock time `now`.
pub fn validate(sample: &Sample, now: DateTime<Utc>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if sample.start_freq_mhz() > sample.end_freq_mhz() {
        issues.push(ValidationIssue::InvertedRange {
            start_mhz: sample.start_freq_mhz(),
            end_mhz: sample.end_freq_mhz(),
        });
    }

    let out_of_range = sample
        .powers()
        .iter()
        .filter(|p| !(MIN_POWER_DBM..=MAX_POWER_DBM).contains(*p))
        .count();
    if out_of_range > 0 {
        issues.push(ValidationIssue::PowerOutOfRange {
            count: out_of_range,
        });
    }

    let powers = sample.powers();
    if powers.len() > 1 && powers.iter().all(|p| *p == powers[0]) {
        issues.push(ValidationIssue::FlatSpectrum { power: powers[0] });
    }

    let drift = (now - sample.timestamp()).num_hours().abs();
    if drift > MAX_TIMESTAMP_DRIFT_HOURS {
        issues.push(ValidationIssue::TimestampDrift { hours: drift });
    }

    issues
}
