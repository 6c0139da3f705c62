//! Canonical frequency type and the one place caller-supplied shapes are normalized.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit a caller may express a frequency in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrequencyUnit {
    #[serde(rename = "Hz")]
    Hz,
    #[serde(rename = "kHz")]
    KHz,
    #[serde(rename = "MHz")]
    MHz,
    #[serde(rename = "GHz")]
    GHz,
}

impl FrequencyUnit {
    /// Multiplier converting a value in this unit to Hz
    pub fn to_hz_factor(self) -> f64 {
        match self {
            FrequencyUnit::Hz => 1.0,
            FrequencyUnit::KHz => 1e3,
            FrequencyUnit::MHz => 1e6,
            FrequencyUnit::GHz => 1e9,
        }
    }
}

impl FromStr for FrequencyUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hz" => Ok(FrequencyUnit::Hz),
            "khz" => Ok(FrequencyUnit::KHz),
            "mhz" => Ok(FrequencyUnit::MHz),
            "ghz" => Ok(FrequencyUnit::GHz),
            other => Err(format!("unknown frequency unit '{other}'")),
        }
    }
}

impl fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrequencyUnit::Hz => "Hz",
            FrequencyUnit::KHz => "kHz",
            FrequencyUnit::MHz => "MHz",
            FrequencyUnit::GHz => "GHz",
        };
        f.write_str(s)
    }
}

/// A positive frequency, stored in whole Hz.
///
/// Equality and hashing use the Hz value, so `1 GHz` and `1000 MHz` are the
/// same frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Frequency {
    hz: u64,
}

impl Frequency {
    /// Build from a value and unit. Returns `None` for zero, negative or non-finite values.
    pub fn from_value(value: f64, unit: FrequencyUnit) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        let hz = (value * unit.to_hz_factor()).round();
        if hz < 1.0 || hz > u64::MAX as f64 {
            return None;
        }
        Some(Self { hz: hz as u64 })
    }

    pub fn from_hz(hz: u64) -> Option<Self> {
        (hz > 0).then_some(Self { hz })
    }

    pub fn from_mhz(mhz: f64) -> Option<Self> {
        Self::from_value(mhz, FrequencyUnit::MHz)
    }

    pub fn hz(&self) -> u64 {
        self.hz
    }

    pub fn mhz(&self) -> f64 {
        self.hz as f64 / 1e6
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz", self.mhz())
    }
}

/// Parses `2400`, `2400MHz`, `2.4 GHz`, `915000kHz`. A bare number is MHz.
impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid frequency value '{}'", number.trim()))?;
        let unit = if unit.trim().is_empty() {
            FrequencyUnit::MHz
        } else {
            unit.parse()?
        };

        Frequency::from_value(value, unit).ok_or_else(|| format!("frequency must be positive: '{s}'"))
    }
}

/// Frequency shapes accepted at the API boundary.
///
/// Bare numbers are MHz. Object shapes default to MHz when `unit` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrequencyInput {
    Bare(f64),
    Value {
        value: f64,
        #[serde(default)]
        unit: Option<String>,
    },
    Legacy {
        frequency: f64,
        #[serde(default)]
        unit: Option<String>,
    },
}

impl FrequencyInput {
    pub fn new(value: f64, unit: FrequencyUnit) -> Self {
        FrequencyInput::Value {
            value,
            unit: Some(unit.to_string()),
        }
    }

    /// Resolve to a canonical frequency, or explain why it was rejected.
    pub fn resolve(&self) -> Result<Frequency, String> {
        let (value, unit) = match self {
            FrequencyInput::Bare(value) => (*value, None),
            FrequencyInput::Value { value, unit } => (*value, unit.as_deref()),
            FrequencyInput::Legacy { frequency, unit } => (*frequency, unit.as_deref()),
        };
        let unit = match unit {
            Some(u) => u.parse()?,
            None => FrequencyUnit::MHz,
        };
        Frequency::from_value(value, unit)
            .ok_or_else(|| format!("frequency must be positive, got {value} {unit}"))
    }
}

impl From<Frequency> for FrequencyInput {
    fn from(freq: Frequency) -> Self {
        FrequencyInput::Value {
            value: freq.hz() as f64,
            unit: Some(FrequencyUnit::Hz.to_string()),
        }
    }
}

/// Normalize caller input, dropping (and logging) entries that do not resolve.
pub fn normalize_frequencies(inputs: &[FrequencyInput]) -> Vec<Frequency> {
    inputs
        .iter()
        .filter_map(|input| match input.resolve() {
            Ok(freq) => Some(freq),
            Err(reason) => {
                tracing::warn!(?input, %reason, "dropping invalid frequency");
                None
            }
        })
        .collect()
}
