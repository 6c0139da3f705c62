//! Sweep binary argument construction

use crate::config::SweepConfig;
use crate::error::{Result, SweepError};
use crate::models::Frequency;

/// Reject centers the binary cannot tune to.
pub fn validate_center(frequency: Frequency, config: &SweepConfig) -> Result<()> {
    let center = frequency.mhz();
    if center < f64::from(config.min_freq_mhz) || center > f64::from(config.max_freq_mhz) {
        return Err(SweepError::FrequencyOutOfRange {
            center_mhz: center,
            min_mhz: config.min_freq_mhz,
            max_mhz: config.max_freq_mhz,
        });
    }
    Ok(())
}

/// `(min, max)` MHz span swept around `frequency`, clamped to the tuning range.
pub fn sweep_range(frequency: Frequency, config: &SweepConfig) -> Result<(u32, u32)> {
    validate_center(frequency, config)?;
    let center = frequency.mhz();
    let span = f64::from(config.span_mhz);
    let lo = f64::from(config.min_freq_mhz);
    let hi = f64::from(config.max_freq_mhz);

    let min = (center - span).floor().clamp(lo, hi) as u32;
    let max = (center + span).ceil().clamp(lo, hi) as u32;
    Ok((min, max))
}

/// `(vga, lna)` gains for `frequency`
pub fn gains(frequency: Frequency, config: &SweepConfig) -> (u32, u32) {
    if frequency.mhz() > f64::from(config.high_band_threshold_mhz) {
        (config.high_band_vga_gain, config.high_band_lna_gain)
    } else {
        (config.vga_gain, config.lna_gain)
    }
}

/// `-f min:max -g vga -l lna -w bin -n`
pub fn build_sweep_args(frequency: Frequency, config: &SweepConfig) -> Result<Vec<String>> {
    let (min, max) = sweep_range(frequency, config)?;
    let (vga, lna) = gains(frequency, config);
    Ok(vec![
        "-f".to_string(),
        format!("{min}:{max}"),
        "-g".to_string(),
        vga.to_string(),
        "-l".to_string(),
        lna.to_string(),
        "-w".to_string(),
        config.bin_width_hz.to_string(),
        "-n".to_string(),
    ])
}
