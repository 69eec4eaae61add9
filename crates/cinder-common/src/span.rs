//! Source location tracking.
//!
//! Positions are byte offsets into the unit source. `Span` is the half-open
//! range `[pos, end)` carried by every syntax-tree node; `LineMap` converts
//! offsets back to line/column pairs for user-facing diagnostics.

use serde::{Deserialize, Serialize};

/// A half-open byte range into the unit source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start offset (inclusive).
    pub pos: u32,
    /// End offset (exclusive).
    pub end: u32,
}

impl Span {
    pub const fn new(pos: u32, end: u32) -> Span {
        Span { pos, end }
    }

    /// Zero-width span used for synthesized nodes.
    pub const EMPTY: Span = Span { pos: 0, end: 0 };

    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.pos)
    }

    pub const fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    pub const fn contains(&self, offset: u32) -> bool {
        offset >= self.pos && offset < self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(&self, other: Span) -> Span {
        Span {
            pos: self.pos.min(other.pos),
            end: self.end.max(other.end),
        }
    }

    /// Slice the unit source by this span. Returns an empty string when the
    /// span lies outside the source (synthesized nodes).
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source
            .get(self.pos as usize..self.end as usize)
            .unwrap_or("")
    }
}

/// A 1-based line/column position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Maps byte offsets to line/column positions.
///
/// Built once per unit from the source text; lookups are a binary search
/// over line-start offsets.
#[derive(Clone, Debug)]
pub struct LineMap {
    line_starts: Vec<u32>,
}

impl LineMap {
    pub fn new(source: &str) -> LineMap {
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        LineMap { line_starts }
    }

    /// Resolve a byte offset to a 1-based line/column pair.
    pub fn position(&self, offset: u32) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Position {
            line: line as u32 + 1,
            column: offset - self.line_starts[line] + 1,
        }
    }
}
