//! Line parser for sweep binary output.
//!
//! Data lines are comma separated:
//! `[date, time,] start_hz, end_hz, bin_width_hz, num_samples, p0, p1, ...`

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::RegexSet;
use std::fmt;
use std::sync::LazyLock;

use crate::models::Sample;

/// Minimum field count of a data line
pub const MIN_FIELDS: usize = 7;

/// Banners, diagnostics and log-prefixed lines that are never spectrum data
static NON_DATA_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)^\s*(info|warn|warning|error|debug)\b",
        r"(?i)found hackrf",
        r"(?i)no hackrf boards? found",
        r"(?i)(libhackrf|hackrf_sweep|hackrf_info) version",
        r"(?i)^\s*(serial number|board id number|firmware version|part id number|usb descriptor)",
        r"(?i)^\s*call hackrf_",
        r"(?i)usb error|libusb",
        r"(?i)permission denied|access denied",
        r"(?i)resource busy|device busy",
        r"(?i)sweeping from",
        r"(?i)stop with ctrl-c",
        r"(?i)total sweeps completed",
    ])
    .expect("non-data patterns are valid regexes")
});

/// Why a line produced no sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidLine {
    /// Banner, diagnostic or log line
    NonData,
    /// Longer than the configured limit; the stored line is truncated
    TooLong { length: usize },
    TooFewFields { found: usize },
    NonNumeric { field: &'static str },
    NoPowerValues,
}

impl fmt::Display for InvalidLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidLine::NonData => write!(f, "non-data line"),
            InvalidLine::TooLong { length } => write!(f, "line too long ({length} chars)"),
            InvalidLine::TooFewFields { found } => {
                write!(f, "expected at least {MIN_FIELDS} fields, found {found}")
            }
            InvalidLine::NonNumeric { field } => write!(f, "non-numeric {field}"),
            InvalidLine::NoPowerValues => write!(f, "no power values"),
        }
    }
}

/// Outcome of parsing one complete line
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Sample(Sample),
    Invalid { line: String, reason: InvalidLine },
}

impl ParsedLine {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedLine::Sample(_))
    }

    pub fn sample(&self) -> Option<&Sample> {
        match self {
            ParsedLine::Sample(sample) => Some(sample),
            ParsedLine::Invalid { .. } => None,
        }
    }

    fn invalid(line: &str, reason: InvalidLine) -> Self {
        ParsedLine::Invalid {
            line: line.to_string(),
            reason,
        }
    }
}

/// True for lines that match a known non-data pattern
pub fn is_non_data_line(line: &str) -> bool {
    NON_DATA_PATTERNS.is_match(line)
}

/// Parse one line (without its terminator).
pub fn parse_line(line: &str, max_line_length: usize) -> ParsedLine {
    let length = line.chars().count();
    if length > max_line_length {
        let truncated: String = line.chars().take(max_line_length).collect();
        return ParsedLine::Invalid {
            line: truncated,
            reason: InvalidLine::TooLong { length },
        };
    }

    if is_non_data_line(line) {
        return ParsedLine::invalid(line, InvalidLine::NonData);
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < MIN_FIELDS {
        return ParsedLine::invalid(
            line,
            InvalidLine::TooFewFields {
                found: fields.len(),
            },
        );
    }

    let (timestamp, rest) = if has_date_prefix(&fields) {
        (parse_timestamp(fields[0], fields[1]), &fields[2..])
    } else {
        (Utc::now(), &fields[..])
    };

    if rest.len() < 5 {
        return ParsedLine::invalid(line, InvalidLine::TooFewFields { found: fields.len() });
    }

    let Some(start_hz) = parse_number(rest[0]) else {
        return ParsedLine::invalid(line, InvalidLine::NonNumeric { field: "start frequency" });
    };
    let Some(end_hz) = parse_number(rest[1]) else {
        return ParsedLine::invalid(line, InvalidLine::NonNumeric { field: "end frequency" });
    };
    let Some(bin_width) = parse_number(rest[2]) else {
        return ParsedLine::invalid(line, InvalidLine::NonNumeric { field: "bin width" });
    };
    let Some(num_samples) = parse_number(rest[3]) else {
        return ParsedLine::invalid(line, InvalidLine::NonNumeric { field: "sample count" });
    };

    let powers: Vec<f64> = rest[4..].iter().filter_map(|f| parse_number(f)).collect();

    match Sample::new(
        timestamp,
        start_hz,
        end_hz,
        bin_width,
        num_samples.max(0.0) as u64,
        powers,
    ) {
        Some(sample) => ParsedLine::Sample(sample),
        None => ParsedLine::invalid(line, InvalidLine::NoPowerValues),
    }
}

/// A leading `date,time` pair: the date contains a dash and is at least 8 chars.
fn has_date_prefix(fields: &[&str]) -> bool {
    fields
        .first()
        .is_some_and(|date| date.contains('-') && date.len() >= 8)
}

fn parse_timestamp(date: &str, time: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

fn parse_number(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}
