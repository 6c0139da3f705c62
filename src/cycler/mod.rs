//! Frequency cycling and blacklisting

mod blacklist;
mod core;

pub use blacklist::FrequencyBlacklist;
pub use core::{
    default_switching_time, CycleConfig, CycleState, FrequencyCycler, DEFAULT_CYCLE_TIME,
};
