use std::convert::Infallible;
use std::str::FromStr;

use ac_matcher::{AhoCorasick, Match};
use piece_tree::{CharBuffer, History, LineRange, ReverseTreeWalker, Tree};
use unicode_segmentation::{GraphemeCursor, GraphemeIncomplete};

use crate::error::Result;

/// Bytes read on each side of the caret for a grapheme step before widening.
const GRAPHEME_WINDOW: usize = 64;

/// 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line_number: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line_number: usize, column: usize) -> Self {
        Self {
            line_number,
            column,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    tree: Tree,
}

impl TextBuffer {
    /// Build from multiple chunks
    pub fn from_chunks(chunks: Vec<CharBuffer>) -> Self {
        Self {
            tree: Tree::from_buffers(chunks),
        }
    }

    /// The underlying piece tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Insert `value` at byte `offset` in the document.
    pub fn insert(&mut self, offset: usize, value: &str) -> Result<()> {
        Ok(self.tree.insert(offset, value)?)
    }

    /// Delete `len` bytes starting at byte `offset`.
    pub fn delete(&mut self, offset: usize, len: usize) -> Result<()> {
        Ok(self.tree.remove(offset, len)?)
    }

    /// Insert without recording an undo step.
    pub fn insert_untracked(&mut self, offset: usize, value: &str) -> Result<()> {
        Ok(self.tree.insert_with(offset, value, History::Suppress)?)
    }

    /// Convenience: insert at (line, column), both 1-based.
    pub fn insert_at(&mut self, line: usize, column: usize, value: &str) -> Result<()> {
        let off = self.get_offset_at(line, column);
        self.insert(off, value)
    }

    /// Convenience: delete a range specified by start (line, column) and length in bytes.
    pub fn delete_at(&mut self, line: usize, column: usize, len: usize) -> Result<()> {
        let off = self.get_offset_at(line, column);
        self.delete(off, len)
    }

    /// Step back one edit. `caret` is stored so the matching redo can hand it
    /// back; returns the op offset recorded with the undone step (the edit
    /// offset, or the caret passed to the redo that produced it).
    pub fn undo(&mut self, caret: usize) -> Option<usize> {
        let result = self.tree.try_undo(caret);
        result.success.then_some(result.op_offset)
    }

    /// Re-apply the last undone edit; returns the caret given to that undo.
    pub fn redo(&mut self, caret: usize) -> Option<usize> {
        let result = self.tree.try_redo(caret);
        result.success.then_some(result.op_offset)
    }

    pub fn can_undo(&self) -> bool {
        self.tree.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.tree.can_redo()
    }

    /// Get complete text content.
    pub fn get_text(&self) -> String {
        self.tree.get_full_text()
    }

    /// Get the number of lines (empty doc => 1 line).
    pub fn get_line_count(&self) -> usize {
        self.tree.line_count()
    }

    /// Get the document byte length.
    pub fn get_length(&self) -> usize {
        self.tree.length()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Get content of a line (1-based). Out-of-range => empty.
    pub fn get_line_content(&self, line_number: usize) -> String {
        if line_number == 0 {
            return String::new();
        }
        self.tree.get_line_content(line_number - 1)
    }

    /// Get all lines (without EOL).
    pub fn get_lines_content(&self) -> Vec<String> {
        (0..self.tree.line_count())
            .map(|line| self.tree.get_line_content(line))
            .collect()
    }

    /// Get the byte length (without EOL) of a line (1-based).
    pub fn get_line_length(&self, line_number: usize) -> usize {
        if line_number == 0 || line_number > self.get_line_count() {
            return 0;
        }
        self.tree.get_line_length(line_number - 1)
    }

    /// 1-based (line, column) to 0-based byte offset. Both are clamped to
    /// the document.
    pub fn get_offset_at(&self, line_number: usize, column: usize) -> usize {
        let line = line_number.clamp(1, self.get_line_count()) - 1;
        let range = self.tree.get_line_range(line);
        let column = column.clamp(1, range.len() + 1);
        range.first + column - 1
    }

    /// 0-based byte offset to 1-based position.
    pub fn get_position_at(&self, offset: usize) -> Position {
        let (line, column) = self.tree.line_column_at(offset);
        Position::new(line + 1, column + 1)
    }

    /// UI-friendly: max column on a line (1-based).
    pub fn get_line_max_column(&self, line_number: usize) -> usize {
        self.get_line_length(line_number) + 1
    }

    /// First match of `matcher` at or after `from`.
    pub fn find_next(&self, matcher: &AhoCorasick, from: usize) -> Option<Match> {
        matcher.find_in_tree_from(&self.tree, from)
    }

    /// Closest match of any pattern that ends before `before`, scanning
    /// backwards. Of several matches starting at the same byte the longest
    /// is reported.
    pub fn find_prev<I, P>(&self, patterns: I, before: usize) -> Result<Option<Match>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let reversed: Vec<Vec<u8>> = patterns
            .into_iter()
            .map(|p| p.as_ref().iter().rev().copied().collect())
            .collect();
        let matcher = AhoCorasick::new(&reversed)?;

        let walker = ReverseTreeWalker::new(&self.tree, before);
        // Index i of the reversed stream is document offset caret - 1 - i.
        let caret = walker.offset();
        Ok(matcher.find(walker).map(|m| Match {
            begin: caret - 1 - m.end,
            end: caret - 1 - m.begin,
            pattern_idx: m.pattern_idx,
        }))
    }

    /// Offset of the next extended grapheme boundary after `offset`.
    pub fn next_grapheme_offset(&self, offset: usize) -> usize {
        let len = self.get_length();
        if offset >= len {
            return len;
        }
        let line = self.tree.get_line_range_with_newline(self.tree.line_at(offset));
        let offset = self.floor_char_boundary(offset, line.first);
        self.grapheme_boundary(line, offset, true).unwrap_or(len)
    }

    /// Offset of the previous extended grapheme boundary before `offset`.
    pub fn prev_grapheme_offset(&self, offset: usize) -> usize {
        let offset = offset.min(self.get_length());
        if offset == 0 {
            return 0;
        }
        // The line holding the byte just before `offset`.
        let line = self.tree.get_line_range_with_newline(self.tree.line_at(offset - 1));
        let offset = self.floor_char_boundary(offset, line.first);
        self.grapheme_boundary(line, offset, false).unwrap_or(0)
    }

    /// Segment `line` (newline included) around `offset`, reading only a
    /// window of it. The window doubles whenever the cursor needs bytes
    /// outside it, until it covers the whole line.
    fn grapheme_boundary(&self, line: LineRange, offset: usize, forward: bool) -> Option<usize> {
        let mut reach = GRAPHEME_WINDOW;
        loop {
            let mut lo = offset.saturating_sub(reach).max(line.first);
            lo = self.floor_char_boundary(lo, line.first);
            let mut hi = offset.saturating_add(reach).min(line.last);
            while hi < line.last && !self.tree.is_char_boundary(hi) {
                hi += 1;
            }
            let chunk = self.tree.get_text_range(lo, hi);

            let mut cursor = GraphemeCursor::new(offset - line.first, line.len(), true);
            let chunk_start = lo - line.first;
            let found = if forward {
                cursor.next_boundary(&chunk, chunk_start)
            } else {
                cursor.prev_boundary(&chunk, chunk_start)
            };
            match found {
                Ok(boundary) => return boundary.map(|b| line.first + b),
                Err(
                    GraphemeIncomplete::PreContext(_)
                    | GraphemeIncomplete::PrevChunk
                    | GraphemeIncomplete::NextChunk,
                ) if lo > line.first || hi < line.last => reach = reach.saturating_mul(2),
                Err(_) => return None,
            }
        }
    }

    fn floor_char_boundary(&self, mut offset: usize, floor: usize) -> usize {
        while offset > floor && !self.tree.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

impl FromStr for TextBuffer {
    type Err = Infallible;

    /// Build from a single string.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self {
            tree: Tree::from(s),
        })
    }
}

impl std::fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.tree, f)
    }
}
