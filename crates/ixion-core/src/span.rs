//! Source positions attached to AST nodes and diagnostics.

use std::fmt;

/// Where a token or node starts in its source file.
///
/// Lines and columns are 1-indexed. `len` covers the token's byte length so a
/// driver can underline the offending text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Smallest span on `self`'s line covering both spans.
    ///
    /// Spans on different lines keep `self` unchanged; diagnostics only need
    /// the start position in that case.
    pub fn to(self, other: Span) -> Span {
        if self.line != other.line {
            return self;
        }
        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span::new(self.line, start, end - start)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}+{}", self.line, self.col, self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
