pub mod device;
pub mod event;
pub mod frequency;
pub mod sample;

pub use device::{DeviceInfo, DeviceState, DeviceStatus, RecoveryPhase};
pub use event::{
    CycleConfigEvent, ErrorEvent, HealthReport, StatusChange, StatusSnapshot, SweepEvent,
    SweepState,
};
pub use frequency::{normalize_frequencies, Frequency, FrequencyInput, FrequencyUnit};
pub use sample::{Sample, SampleMetadata};
