//! Piece-tree text buffer.
//!
//! The document is the in-order concatenation of [`Piece`]s, each a run of an
//! immutable original buffer or of the append-only mod buffer. Pieces live in
//! a persistent red-black tree, so undo and redo just swap roots.

mod buffer;
mod error;
mod rb_tree;
mod walker;

use std::fmt;
use std::rc::Rc;

use log::{debug, trace, warn};

pub use buffer::{BufferCollection, BufferCursor, CharBuffer, LineStarts, MOD_BUFFER, Piece};
pub use error::PieceTreeError;
pub use rb_tree::{NodeColor, RedBlackTree, TreeNode};
pub use walker::{ReverseTreeWalker, TreeWalker};

pub type Result<T> = std::result::Result<T, PieceTreeError>;

#[derive(Debug, Clone)]
struct UndoRedoEntry {
    root: RedBlackTree,
    op_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoRedoResult {
    pub success: bool,
    pub op_offset: usize,
}

/// Half-open byte range `[first, last)` of one line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineRange {
    pub first: usize,
    pub last: usize,
}

impl LineRange {
    pub fn len(&self) -> usize {
        self.last - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }
}

/// Whether an edit pushes an undo entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum History {
    #[default]
    Record,
    Suppress,
}

/// Where an offset lands in the tree.
#[derive(Debug, Clone, Copy)]
struct NodePosition {
    piece: Piece,
    // Bytes into `piece`.
    remainder: usize,
    // Document offset of the piece's first byte.
    start_offset: usize,
    // 0-based line of the offset.
    line: usize,
}

/// Read-only queries shared by [`Tree`] and [`OwningSnapshot`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct View<'a> {
    pub(crate) buffers: &'a BufferCollection,
    pub(crate) root: &'a RedBlackTree,
}

impl<'a> View<'a> {
    fn length(&self) -> usize {
        self.root.len()
    }

    fn line_feed_count(&self) -> usize {
        self.root.line_feed_count()
    }

    /// Piece containing `off`. An offset at a boundary resolves to the piece
    /// starting there; `off == length` resolves to the end of the last piece.
    fn node_at(&self, mut off: usize) -> Option<NodePosition> {
        let mut node_start_offset = 0;
        let mut newline_count = 0;
        let mut cur = self.root.node();

        while let Some(node) = cur {
            let piece = node.piece();
            if node.size_left > off {
                cur = node.left().node();
            } else if node.size_left + piece.length > off || node.right().is_empty() {
                let remainder = off - node.size_left;
                if remainder > piece.length {
                    return None;
                }
                let pos = self.buffers.buffer_position(piece, remainder);
                return Some(NodePosition {
                    piece: *piece,
                    remainder,
                    start_offset: node_start_offset + node.size_left,
                    line: newline_count + node.lf_left + pos.line - piece.start.line,
                });
            } else {
                off -= node.size_left + piece.length;
                node_start_offset += node.size_left + piece.length;
                newline_count += node.lf_left + piece.line_feed_cnt;
                cur = node.right().node();
            }
        }
        None
    }

    fn at(&self, offset: usize) -> Result<u8> {
        let len = self.length();
        if offset >= len {
            return Err(PieceTreeError::OutOfRange { offset, len });
        }
        let pos = self
            .node_at(offset)
            .ok_or(PieceTreeError::OutOfRange { offset, len })?;
        Ok(self.buffers.piece_bytes(&pos.piece)[pos.remainder])
    }

    fn line_at(&self, offset: usize) -> usize {
        let offset = offset.min(self.length());
        self.node_at(offset).map_or(0, |pos| pos.line)
    }

    /// Offset of the first byte of `line`; the document length once `line`
    /// is past the last line.
    fn line_start(&self, line: usize) -> usize {
        if line == 0 {
            return 0;
        }
        let mut remaining = line;
        let mut offset = 0;
        let mut cur = self.root.node();

        while let Some(node) = cur {
            let piece = node.piece();
            if remaining <= node.lf_left {
                cur = node.left().node();
            } else if remaining <= node.lf_left + piece.line_feed_cnt {
                let index = remaining - node.lf_left - 1;
                return offset + node.size_left + self.buffers.accumulate_value(piece, index);
            } else {
                remaining -= node.lf_left + piece.line_feed_cnt;
                offset += node.size_left + piece.length;
                cur = node.right().node();
            }
        }
        offset
    }

    fn get_line_range(&self, line: usize) -> LineRange {
        let first = self.line_start(line);
        let last = if line < self.line_feed_count() {
            // Drop the '\n' that ends the line.
            self.line_start(line + 1) - 1
        } else {
            self.length()
        };
        LineRange { first, last }
    }

    fn get_line_range_with_newline(&self, line: usize) -> LineRange {
        LineRange {
            first: self.line_start(line),
            last: self.line_start(line.saturating_add(1)),
        }
    }

    fn line_column_at(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.length());
        let line = self.line_at(offset);
        (line, offset - self.line_start(line))
    }

    fn assemble_range(&self, range: LineRange) -> String {
        let mut buf = Vec::with_capacity(range.len());
        let mut walker = TreeWalker::with_view(*self, range.first);
        while buf.len() < range.len() {
            let Some(chunk) = walker.next_chunk() else {
                break;
            };
            let take = chunk.len().min(range.len() - buf.len());
            buf.extend_from_slice(&chunk[..take]);
        }
        match String::from_utf8(buf) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    fn get_line_content(&self, line: usize) -> String {
        if line > self.line_feed_count() {
            return String::new();
        }
        self.assemble_range(self.get_line_range(line))
    }

    fn get_full_text(&self) -> String {
        self.assemble_range(LineRange {
            first: 0,
            last: self.length(),
        })
    }

    fn is_char_boundary(&self, offset: usize) -> bool {
        match self.at(offset) {
            // Continuation bytes look like 0b10xx_xxxx.
            Ok(byte) => (byte as i8) >= -0x40,
            Err(_) => offset == self.length(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    buffers: BufferCollection,
    root: RedBlackTree,
    // End of the mod buffer right after the last insert.
    last_insert: BufferCursor,
    // Document offset just past the last insert.
    end_last_insert: Option<usize>,
    lf_count: usize,
    total_content_length: usize,
    undo_stack: Vec<UndoRedoEntry>,
    redo_stack: Vec<UndoRedoEntry>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::from_buffers(Vec::new())
    }

    /// Build from immutable original buffers, laid out in order.
    pub fn from_buffers(chunks: Vec<CharBuffer>) -> Self {
        let orig_buffers = chunks.into_iter().map(Rc::new).collect();
        let mut tree = Self {
            buffers: BufferCollection::new(orig_buffers),
            root: RedBlackTree::new(),
            last_insert: BufferCursor::default(),
            end_last_insert: None,
            lf_count: 0,
            total_content_length: 0,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        };
        tree.build_tree();
        tree
    }

    fn build_tree(&mut self) {
        let mut offset = 0;
        for (i, chunk) in self.buffers.orig_buffers().iter().enumerate() {
            if chunk.is_empty() {
                continue;
            }
            let end = chunk.end_cursor();
            let piece = Piece::new(
                i,
                BufferCursor::new(0, 0),
                end,
                chunk.len(),
                BufferCollection::line_feed_count(BufferCursor::new(0, 0), end),
            );
            self.root = self.root.insert(piece, offset);
            offset += piece.length;
        }
        self.compute_buffer_meta();
        debug!(
            "piece tree built from {} buffers ({} bytes, {} lines)",
            self.buffers.orig_buffers().len(),
            self.total_content_length,
            self.line_count()
        );
    }

    pub(crate) fn view(&self) -> View<'_> {
        View {
            buffers: &self.buffers,
            root: &self.root,
        }
    }

    pub fn buffers(&self) -> &BufferCollection {
        &self.buffers
    }

    /// Current root; cloning it is O(1).
    pub fn head(&self) -> &RedBlackTree {
        &self.root
    }

    // ---------- Manipulation ----------

    pub fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        self.insert_with(offset, text, History::Record)
    }

    pub fn insert_with(&mut self, offset: usize, text: &str, history: History) -> Result<()> {
        if offset > self.total_content_length {
            return Err(PieceTreeError::InvalidOffset {
                offset,
                len: self.total_content_length,
            });
        }
        if text.is_empty() {
            return Ok(());
        }
        if !self.view().is_char_boundary(offset) {
            warn!("rejected insert inside a UTF-8 sequence at {offset}");
            return Err(PieceTreeError::NotCharBoundary { offset });
        }
        trace!("insert {} bytes at {offset}", text.len());

        let old_root = self.root.clone();
        self.internal_insert(offset, text);
        // Any edit ends the redo branch, recorded or not.
        self.redo_stack.clear();
        if history == History::Record {
            self.append_undo(old_root, offset);
        }
        Ok(())
    }

    /// Remove up to `count` bytes at `offset`; the range is clamped to the
    /// document.
    pub fn remove(&mut self, offset: usize, count: usize) -> Result<()> {
        self.remove_with(offset, count, History::Record)
    }

    pub fn erase(&mut self, offset: usize, count: usize) -> Result<()> {
        self.remove(offset, count)
    }

    pub fn remove_with(&mut self, offset: usize, count: usize, history: History) -> Result<()> {
        if offset >= self.total_content_length || count == 0 {
            return Ok(());
        }
        let count = count.min(self.total_content_length - offset);
        let view = self.view();
        for edge in [offset, offset + count] {
            if !view.is_char_boundary(edge) {
                warn!("rejected remove splitting a UTF-8 sequence at {edge}");
                return Err(PieceTreeError::NotCharBoundary { offset: edge });
            }
        }
        trace!("remove {count} bytes at {offset}");

        let old_root = self.root.clone();
        self.internal_remove(offset, count);
        // Any edit ends the redo branch, recorded or not.
        self.redo_stack.clear();
        if history == History::Record {
            self.append_undo(old_root, offset);
        }
        Ok(())
    }

    pub fn try_undo(&mut self, op_offset: usize) -> UndoRedoResult {
        let Some(entry) = self.undo_stack.pop() else {
            return UndoRedoResult {
                success: false,
                op_offset: 0,
            };
        };
        trace!("undo to op offset {}", entry.op_offset);
        let current = std::mem::replace(&mut self.root, entry.root);
        self.redo_stack.push(UndoRedoEntry {
            root: current,
            op_offset,
        });
        self.after_history_jump();
        UndoRedoResult {
            success: true,
            op_offset: entry.op_offset,
        }
    }

    pub fn try_redo(&mut self, op_offset: usize) -> UndoRedoResult {
        let Some(entry) = self.redo_stack.pop() else {
            return UndoRedoResult {
                success: false,
                op_offset: 0,
            };
        };
        trace!("redo to op offset {}", entry.op_offset);
        let current = std::mem::replace(&mut self.root, entry.root);
        self.undo_stack.push(UndoRedoEntry {
            root: current,
            op_offset,
        });
        self.after_history_jump();
        UndoRedoResult {
            success: true,
            op_offset: entry.op_offset,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Independent read-only copy of the current document.
    pub fn snapshot(&self) -> OwningSnapshot {
        OwningSnapshot {
            buffers: self.buffers.clone(),
            root: self.root.clone(),
        }
    }

    fn after_history_jump(&mut self) {
        self.end_last_insert = None;
        self.compute_buffer_meta();
    }

    fn append_undo(&mut self, old_root: RedBlackTree, op_offset: usize) {
        self.undo_stack.push(UndoRedoEntry {
            root: old_root,
            op_offset,
        });
    }

    fn compute_buffer_meta(&mut self) {
        self.lf_count = self.root.line_feed_count();
        self.total_content_length = self.root.len();
    }

    fn build_piece(&mut self, text: &str) -> Piece {
        let piece = self.buffers.build_piece(text);
        self.last_insert = piece.end;
        piece
    }

    fn internal_insert(&mut self, offset: usize, text: &str) {
        let sequential = self.end_last_insert == Some(offset);
        self.end_last_insert = Some(offset + text.len());

        if self.root.is_empty() {
            let piece = self.build_piece(text);
            self.root = self.root.insert(piece, 0);
            self.compute_buffer_meta();
            return;
        }

        // Typing right after the previous insert: grow that piece instead of
        // adding a new one, provided it still ends at the mod buffer's end.
        if sequential && offset > 0 {
            if let Some(prev) = self.view().node_at(offset - 1) {
                let ends_here = prev.start_offset + prev.piece.length == offset;
                if ends_here
                    && prev.piece.buffer_idx == MOD_BUFFER
                    && prev.piece.end == self.last_insert
                {
                    trace!("extending mod piece at {}", prev.start_offset);
                    let new_piece = self.build_piece(text);
                    self.combine_pieces(prev, new_piece);
                    self.compute_buffer_meta();
                    return;
                }
            }
        }

        let Some(pos) = self.view().node_at(offset) else {
            return;
        };
        let piece = self.build_piece(text);

        if pos.remainder == 0 || pos.remainder == pos.piece.length {
            // At a piece boundary (or the document end).
            self.root = self.root.insert(piece, offset);
        } else {
            // Split the piece and put the new text between the halves.
            let insert_pos = self.buffers.buffer_position(&pos.piece, pos.remainder);
            let left = self.buffers.trim_piece_right(&pos.piece, insert_pos);
            let right = self.buffers.trim_piece_left(&pos.piece, insert_pos);
            self.root = self
                .root
                .remove(pos.start_offset)
                .insert(left, pos.start_offset)
                .insert(piece, pos.start_offset + left.length)
                .insert(right, pos.start_offset + left.length + piece.length);
        }
        self.compute_buffer_meta();
    }

    fn combine_pieces(&mut self, existing: NodePosition, new_piece: Piece) {
        let old = existing.piece;
        let combined = Piece {
            start: old.start,
            length: old.length + new_piece.length,
            line_feed_cnt: old.line_feed_cnt + new_piece.line_feed_cnt,
            ..new_piece
        };
        self.root = self
            .root
            .remove(existing.start_offset)
            .insert(combined, existing.start_offset);
    }

    fn internal_remove(&mut self, offset: usize, count: usize) {
        self.end_last_insert = None;
        let view = self.view();
        let (Some(first), Some(last)) = (view.node_at(offset), view.node_at(offset + count)) else {
            return;
        };
        let start_split_pos = self.buffers.buffer_position(&first.piece, first.remainder);

        if first.start_offset == last.start_offset {
            // The whole range sits inside one piece.
            let end_split_pos = self.buffers.buffer_position(&first.piece, last.remainder);
            let root = self.root.remove(first.start_offset);
            self.root = if first.start_offset == offset {
                if count == first.piece.length {
                    root
                } else {
                    let piece = self.buffers.trim_piece_left(&first.piece, end_split_pos);
                    root.insert(piece, first.start_offset)
                }
            } else if first.start_offset + first.piece.length == offset + count {
                let piece = self.buffers.trim_piece_right(&first.piece, start_split_pos);
                root.insert(piece, first.start_offset)
            } else {
                let (left, right) =
                    self.buffers
                        .shrink_piece(&first.piece, start_split_pos, end_split_pos);
                // Right goes in first so left lands before it.
                root.insert(right, first.start_offset)
                    .insert(left, first.start_offset)
            };
            self.compute_buffer_meta();
            return;
        }

        let new_first = self.buffers.trim_piece_right(&first.piece, start_split_pos);
        let end_split_pos = self.buffers.buffer_position(&last.piece, last.remainder);
        let new_last = self.buffers.trim_piece_left(&last.piece, end_split_pos);

        self.remove_node_range(first, offset + count);
        // A range ending on a boundary leaves `last` in the tree untouched.
        if last.remainder != 0 && new_last.length != 0 {
            self.root = self.root.insert(new_last, first.start_offset);
        }
        if new_first.length != 0 {
            self.root = self.root.insert(new_first, first.start_offset);
        }
        self.compute_buffer_meta();
    }

    /// Drop every piece starting in `[first.start_offset, end)`.
    fn remove_node_range(&mut self, first: NodePosition, end: usize) {
        let mut consumed = first.start_offset;
        while consumed < end {
            let Some(pos) = self.view().node_at(first.start_offset) else {
                break;
            };
            consumed += pos.piece.length;
            self.root = self.root.remove(first.start_offset);
        }
    }

    // ---------- Queries ----------

    /// Byte at `offset`.
    pub fn at(&self, offset: usize) -> Result<u8> {
        self.view().at(offset)
    }

    pub fn length(&self) -> usize {
        self.total_content_length
    }

    pub fn is_empty(&self) -> bool {
        self.total_content_length == 0
    }

    pub fn line_feed_count(&self) -> usize {
        self.lf_count
    }

    pub fn line_count(&self) -> usize {
        self.lf_count + 1
    }

    /// 0-based line containing `offset`; offsets past the end map to the last line.
    pub fn line_at(&self, offset: usize) -> usize {
        self.view().line_at(offset)
    }

    pub fn line_column_at(&self, offset: usize) -> (usize, usize) {
        self.view().line_column_at(offset)
    }

    pub fn line_start(&self, line: usize) -> usize {
        self.view().line_start(line)
    }

    /// Content range of `line`, excluding its newline.
    pub fn get_line_range(&self, line: usize) -> LineRange {
        self.view().get_line_range(line)
    }

    pub fn get_line_range_with_newline(&self, line: usize) -> LineRange {
        self.view().get_line_range_with_newline(line)
    }

    pub fn get_line_length(&self, line: usize) -> usize {
        self.get_line_range(line).len()
    }

    /// Text of `line` without its newline; empty past the last line.
    pub fn get_line_content(&self, line: usize) -> String {
        self.view().get_line_content(line)
    }

    pub fn get_full_text(&self) -> String {
        self.view().get_full_text()
    }

    /// Bytes `first..last`, clamped to the document.
    pub fn get_text_range(&self, first: usize, last: usize) -> String {
        let last = last.min(self.total_content_length);
        let first = first.min(last);
        self.view().assemble_range(LineRange { first, last })
    }

    /// Whether `offset` starts a char or is the end of the document.
    pub fn is_char_boundary(&self, offset: usize) -> bool {
        self.view().is_char_boundary(offset)
    }
}

impl From<&str> for Tree {
    fn from(text: &str) -> Self {
        Self::from_buffers(vec![CharBuffer::from(text)])
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_full_text())
    }
}

/// A frozen document: owns its buffers and shares the root it was taken from.
#[derive(Debug, Clone)]
pub struct OwningSnapshot {
    buffers: BufferCollection,
    root: RedBlackTree,
}

impl OwningSnapshot {
    pub(crate) fn view(&self) -> View<'_> {
        View {
            buffers: &self.buffers,
            root: &self.root,
        }
    }

    pub fn at(&self, offset: usize) -> Result<u8> {
        self.view().at(offset)
    }

    pub fn length(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn line_feed_count(&self) -> usize {
        self.root.line_feed_count()
    }

    pub fn line_count(&self) -> usize {
        self.line_feed_count() + 1
    }

    pub fn line_at(&self, offset: usize) -> usize {
        self.view().line_at(offset)
    }

    pub fn get_line_range(&self, line: usize) -> LineRange {
        self.view().get_line_range(line)
    }

    pub fn get_line_content(&self, line: usize) -> String {
        self.view().get_line_content(line)
    }

    pub fn get_full_text(&self) -> String {
        self.view().get_full_text()
    }
}

impl fmt::Display for OwningSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_full_text())
    }
}
