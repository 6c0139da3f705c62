//! Line reassembly with bounded memory

use tracing::{error, trace, warn};

use super::parser::{parse_line, ParsedLine};
use crate::config::BufferConfig;

/// Counters kept across the life of a buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub total_lines: u64,
    pub total_bytes: u64,
    pub invalid_lines: u64,
    pub overflow_count: u32,
}

/// Reassembles a byte stream into lines and parses each complete line.
///
/// The unterminated tail is kept between chunks. Its length never exceeds
/// `max_buffer_size`: on overflow the oldest half is dropped.
#[derive(Debug)]
pub struct BufferManager {
    config: BufferConfig,
    buffer: Vec<u8>,
    stats: BufferStats,
}

impl BufferManager {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            buffer: Vec::with_capacity(config.max_buffer_size.min(64 * 1024)),
            config,
            stats: BufferStats::default(),
        }
    }

    /// Append `chunk` and hand every complete line to `on_line`.
    pub fn process_chunk<F>(&mut self, chunk: &[u8], mut on_line: F)
    where
        F: FnMut(ParsedLine),
    {
        self.stats.total_bytes += chunk.len() as u64;
        self.buffer.extend_from_slice(chunk);

        let max_line_length = self.config.max_line_length;
        let mut consumed = 0;
        while let Some(offset) = self.buffer[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + offset;
            let raw = &self.buffer[consumed..end];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            consumed = end + 1;

            if raw.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let text = String::from_utf8_lossy(raw);
            let parsed = parse_line(&text, max_line_length);
            self.stats.total_lines += 1;
            if let ParsedLine::Invalid { reason, .. } = &parsed {
                self.stats.invalid_lines += 1;
                trace!(%reason, "skipping line");
            }
            on_line(parsed);
        }
        self.buffer.drain(..consumed);

        if self.buffer.len() > self.config.max_buffer_size {
            self.handle_overflow();
        }
    }

    fn handle_overflow(&mut self) {
        let keep = self.config.max_buffer_size / 2;
        let discard = self.buffer.len() - keep;
        self.buffer.drain(..discard);
        self.stats.overflow_count += 1;

        if self.stats.overflow_count > self.config.overflow_warning_threshold {
            error!(
                discarded = discard,
                overflows = self.stats.overflow_count,
                "sweep output buffer keeps overflowing; the process may be emitting unterminated data"
            );
        } else {
            warn!(
                discarded = discard,
                overflows = self.stats.overflow_count,
                "sweep output buffer overflow, dropped oldest data"
            );
        }
    }

    /// Bytes currently held waiting for a line terminator
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    /// Drop any partial line. Counters are kept.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Drop the partial line and zero all counters
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.stats = BufferStats::default();
    }
}
