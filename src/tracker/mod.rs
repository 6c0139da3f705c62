//! Error tracking, classification and recovery gating.

pub mod analyzer;
mod core;
pub mod recovery;

pub use analyzer::{
    analyze, classify_error, is_error_line, ErrorAnalysis, ErrorType, RecommendedAction, Severity,
};
pub use core::{ErrorContext, ErrorRecord, ErrorTracker, FAILURE_WINDOW};
pub use recovery::{RecoveryManager, RecoveryOutcome};
