//! Line/column positions and the per-file UTF-16 column mapper.
//!
//! The engine works in byte offsets internally; the edit wire format uses
//! line/character positions with characters counted in UTF-16 code units
//! (the host editor's standard). `LineMap` converts between the two.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// A position in a source file (0-indexed line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed column in UTF-16 code units
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Position { line, character }
    }
}

/// A range in a source file, in line/character coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Range { start, end }
    }
}

/// Per-file map from byte offsets to line/character positions.
///
/// Stores the starting byte offset of every line; lookups are a binary
/// search followed by a UTF-16 width scan over at most one line.
#[derive(Debug, Clone)]
pub struct LineMap {
    line_starts: Vec<u32>,
}

impl LineMap {
    /// Build a line map from source text. Recognizes `\n`, `\r\n` and bare `\r`.
    pub fn build(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push((i + 1) as u32);
            } else if ch == '\r' && source.as_bytes().get(i + 1) != Some(&b'\n') {
                line_starts.push((i + 1) as u32);
            }
        }
        LineMap { line_starts }
    }

    /// Number of lines in the file.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset to a `Position` with a UTF-16 column.
    pub fn position(&self, offset: u32, source: &str) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0) as usize;
        let end = (offset as usize).min(source.len());
        let start = line_start.min(end);
        let slice = source.get(start..end).unwrap_or("");
        let character = slice.chars().map(|ch| ch.len_utf16() as u32).sum();
        Position {
            line: line as u32,
            character,
        }
    }

    /// Convert a byte span to a line/character `Range`.
    pub fn range(&self, span: Span, source: &str) -> Range {
        Range {
            start: self.position(span.start, source),
            end: self.position(span.end, source),
        }
    }

    /// Convert a `Position` back to a byte offset, or `None` when the line
    /// does not exist.
    pub fn offset(&self, position: Position, source: &str) -> Option<u32> {
        let line_idx = position.line as usize;
        let line_start = *self.line_starts.get(line_idx)?;
        let line_limit = self
            .line_starts
            .get(line_idx + 1)
            .copied()
            .unwrap_or(source.len() as u32);
        let slice = source.get(line_start as usize..line_limit as usize)?;

        let mut utf16 = 0u32;
        let mut bytes = 0u32;
        for ch in slice.chars() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            let width = ch.len_utf16() as u32;
            if utf16 + width > position.character {
                break;
            }
            utf16 += width;
            bytes += ch.len_utf8() as u32;
            if utf16 == position.character {
                break;
            }
        }
        Some(line_start + bytes)
    }
}
