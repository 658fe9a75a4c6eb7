//! Byte accounting for compaction runs

use std::fmt;

/// Size of a body before and after compaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionStats {
    pub original_bytes: usize,
    pub compacted_bytes: usize,
}

impl CompactionStats {
    pub fn new(original_bytes: usize, compacted_bytes: usize) -> Self {
        Self {
            original_bytes,
            compacted_bytes,
        }
    }

    /// Add another body's sizes to this running total
    pub fn absorb(&mut self, other: CompactionStats) {
        self.original_bytes += other.original_bytes;
        self.compacted_bytes += other.compacted_bytes;
    }

    /// Bytes saved; negative if compaction grew the body
    pub fn saved_bytes(&self) -> i64 {
        self.original_bytes as i64 - self.compacted_bytes as i64
    }

    pub fn reduction_pct(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        self.saved_bytes() as f64 / self.original_bytes as f64 * 100.0
    }
}

impl fmt::Display for CompactionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}, saved {} ({:.1}% reduction)",
            format_bytes(self.original_bytes as i64),
            format_bytes(self.compacted_bytes as i64),
            format_bytes(self.saved_bytes()),
            self.reduction_pct()
        )
    }
}

/// Human-readable byte size with two decimals, e.g. `1.50 KB`
pub fn format_bytes(size: i64) -> String {
    let mut value = size as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value.abs() < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} TB", value)
}
