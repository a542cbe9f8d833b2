//! Byte-offset source spans and line/column mapping.
//!
//! Spans are half-open byte ranges into the original source text. They are
//! attached to diagnostics so reporting layers can render source snippets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A half-open byte range into source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    /// Create a new span from a byte range.
    pub fn new(range: std::ops::Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }

    /// Get the start offset of the span.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Get the end offset of the span.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Get the length of the span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Create a union of two spans (encompassing both).
    pub fn union(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::new(0..0)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Map a byte offset into 1-based line and column numbers.
///
/// Offsets past the end of the source clamp to the final position.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let mut line = 1;
    let mut col = 1;
    for (idx, ch) in source.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_accessors() {
        let span = Span::new(3..10);
        assert_eq!(span.start(), 3);
        assert_eq!(span.end(), 10);
        assert_eq!(span.len(), 7);
        assert!(!span.is_empty());
    }

    #[test]
    fn test_span_union() {
        let a = Span::new(2..5);
        let b = Span::new(4..9);
        assert_eq!(a.union(b), Span::new(2..9));
    }

    #[test]
    fn test_line_col_first_line() {
        assert_eq!(line_col("hello", 0), (1, 1));
        assert_eq!(line_col("hello", 3), (1, 4));
    }

    #[test]
    fn test_line_col_multiline() {
        let src = "ab\ncd\nef";
        assert_eq!(line_col(src, 3), (2, 1));
        assert_eq!(line_col(src, 4), (2, 2));
        assert_eq!(line_col(src, 7), (3, 2));
    }

    #[test]
    fn test_line_col_clamps() {
        assert_eq!(line_col("ab", 99), (1, 3));
    }
}
