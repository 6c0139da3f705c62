use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{FrequencyInput, FrequencyUnit};

/// Arguments of a start command, as callers send them.
///
/// Single-frequency callers may send `centerFrequency` (Hz unless `unit` says
/// otherwise) instead of a `frequencies` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepRequest {
    #[serde(default)]
    pub frequencies: Vec<FrequencyInput>,
    /// Dwell per frequency in milliseconds
    #[serde(default)]
    pub cycle_time: Option<u64>,
    /// Settle window between frequencies in milliseconds
    #[serde(default)]
    pub switching_time: Option<u64>,
    #[serde(default)]
    pub center_frequency: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl SweepRequest {
    pub fn new(frequencies: Vec<FrequencyInput>) -> Self {
        Self {
            frequencies,
            ..Self::default()
        }
    }

    pub fn with_cycle_time(mut self, ms: u64) -> Self {
        self.cycle_time = Some(ms);
        self
    }

    pub fn with_switching_time(mut self, ms: u64) -> Self {
        self.switching_time = Some(ms);
        self
    }

    /// The frequency list, falling back to `centerFrequency`.
    pub fn frequency_inputs(&self) -> Vec<FrequencyInput> {
        if !self.frequencies.is_empty() {
            return self.frequencies.clone();
        }
        match self.center_frequency {
            Some(center) => vec![FrequencyInput::Value {
                value: center,
                unit: Some(
                    self.unit
                        .clone()
                        .unwrap_or_else(|| FrequencyUnit::Hz.to_string()),
                ),
            }],
            None => Vec::new(),
        }
    }

    pub fn cycle_time_or(&self, default_ms: u64) -> Duration {
        Duration::from_millis(self.cycle_time.unwrap_or(default_ms))
    }

    pub fn switching_time(&self) -> Option<Duration> {
        self.switching_time.map(Duration::from_millis)
    }
}
