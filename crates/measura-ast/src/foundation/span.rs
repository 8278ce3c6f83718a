//! Source location tokens attached to declarations and diagnostics.
//!
//! The resolution engine never interprets a [`Span`]. It is produced by the
//! declaration extractor, carried through every stage unchanged, and handed
//! back on diagnostics so a front end can point at the offending source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compact source location reference.
///
/// Points to a byte range in a source file with cached line number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index of the originating source file, as assigned by the extractor
    pub file_id: u16,
    /// Byte offset of start position
    pub start: u32,
    /// Byte offset of end position (exclusive)
    pub end: u32,
    /// Line number (1-based) of the start position
    pub start_line: u16,
}

impl Span {
    /// Create a new span.
    pub fn new(file_id: u16, start: u32, end: u32, start_line: u16) -> Self {
        Self {
            file_id,
            start,
            end,
            start_line,
        }
    }

    /// Create a zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0, 1)
    }

    /// Check if this span is zero-length.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Length of this span in bytes; zero for malformed spans.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_id, self.start_line)
    }
}
