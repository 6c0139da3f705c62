//! One parsed line of sweep output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary statistics derived from a sample's power values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub min_power: f64,
    pub max_power: f64,
    pub avg_power: f64,
    pub power_count: usize,
    pub bin_width_hz: f64,
    /// Sample count reported by the sweep binary for this line
    pub sample_count: u64,
}

/// A spectrum slice. Immutable once built; construct through [`Sample::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    timestamp: DateTime<Utc>,
    center_freq_mhz: f64,
    start_freq_mhz: f64,
    end_freq_mhz: f64,
    powers: Vec<f64>,
    metadata: SampleMetadata,
}

impl Sample {
    /// Build a sample from raw Hz bounds. Returns `None` when `powers` is empty.
    pub fn new(
        timestamp: DateTime<Utc>,
        start_freq_hz: f64,
        end_freq_hz: f64,
        bin_width_hz: f64,
        sample_count: u64,
        powers: Vec<f64>,
    ) -> Option<Self> {
        if powers.is_empty() {
            return None;
        }

        let (min_power, max_power, sum) = powers.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &p| (min.min(p), max.max(p), sum + p),
        );
        let start_freq_mhz = start_freq_hz / 1e6;
        let end_freq_mhz = end_freq_hz / 1e6;

        Some(Self {
            timestamp,
            center_freq_mhz: (start_freq_mhz + end_freq_mhz) / 2.0,
            start_freq_mhz,
            end_freq_mhz,
            metadata: SampleMetadata {
                min_power,
                max_power,
                avg_power: sum / powers.len() as f64,
                power_count: powers.len(),
                bin_width_hz,
                sample_count,
            },
            powers,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn center_freq_mhz(&self) -> f64 {
        self.center_freq_mhz
    }

    pub fn start_freq_mhz(&self) -> f64 {
        self.start_freq_mhz
    }

    pub fn end_freq_mhz(&self) -> f64 {
        self.end_freq_mhz
    }

    pub fn powers(&self) -> &[f64] {
        &self.powers
    }

    pub fn metadata(&self) -> &SampleMetadata {
        &self.metadata
    }

    /// Strongest bin in dBm
    pub fn peak_power(&self) -> f64 {
        self.metadata.max_power
    }
}
