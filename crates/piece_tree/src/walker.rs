//! Stateful byte cursors over a piece tree.
//!
//! Both walkers keep an explicit stack of `(node, direction)` frames instead
//! of recursing, and hold the unread part of the current piece as a slice so
//! that stepping is O(1) until a piece boundary is crossed.

use std::mem;

use crate::buffer::BufferCollection;
use crate::rb_tree::{RedBlackTree, TreeNode};
use crate::{OwningSnapshot, Tree, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy)]
struct StackEntry<'a> {
    node: &'a TreeNode,
    dir: Direction,
}

/// Forward walker. Yields the byte at `offset()` and advances.
#[derive(Debug)]
pub struct TreeWalker<'a> {
    buffers: &'a BufferCollection,
    root: &'a RedBlackTree,
    stack: Vec<StackEntry<'a>>,
    total_offset: usize,
    total_content_length: usize,
    chunk: &'a [u8],
}

impl<'a> TreeWalker<'a> {
    /// Walker positioned at `offset`, clamped to the document length.
    pub fn new(tree: &'a Tree, offset: usize) -> Self {
        Self::with_view(tree.view(), offset)
    }

    pub fn over_snapshot(snapshot: &'a OwningSnapshot, offset: usize) -> Self {
        Self::with_view(snapshot.view(), offset)
    }

    pub(crate) fn with_view(view: View<'a>, offset: usize) -> Self {
        let mut walker = Self {
            buffers: view.buffers,
            root: view.root,
            stack: Vec::new(),
            total_offset: 0,
            total_content_length: view.root.len(),
            chunk: &[],
        };
        walker.seek(offset);
        walker
    }

    /// The byte `next()` would return, without consuming it.
    pub fn current(&mut self) -> Option<u8> {
        if self.chunk.is_empty() {
            self.populate_ptrs();
        }
        self.chunk.first().copied()
    }

    /// Rest of the current piece, consumed in one step.
    pub fn next_chunk(&mut self) -> Option<&'a [u8]> {
        if self.chunk.is_empty() {
            self.populate_ptrs();
        }
        if self.chunk.is_empty() {
            return None;
        }
        let chunk = mem::take(&mut self.chunk);
        self.total_offset += chunk.len();
        Some(chunk)
    }

    /// Re-root the traversal at `offset` in O(log n).
    pub fn seek(&mut self, offset: usize) {
        let offset = offset.min(self.total_content_length);
        self.total_offset = offset;
        self.fast_forward_to(offset);
    }

    pub fn exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn remaining(&self) -> usize {
        self.total_content_length - self.total_offset
    }

    pub fn offset(&self) -> usize {
        self.total_offset
    }

    fn populate_ptrs(&mut self) {
        while let Some(entry) = self.stack.last_mut() {
            let node = entry.node;
            match entry.dir {
                Direction::Left => {
                    entry.dir = Direction::Center;
                    if let Some(left) = node.left().node() {
                        self.stack.push(StackEntry {
                            node: left,
                            dir: Direction::Left,
                        });
                    }
                }
                Direction::Center => {
                    entry.dir = Direction::Right;
                    self.chunk = self.buffers.piece_bytes(node.piece());
                    if !self.chunk.is_empty() {
                        return;
                    }
                }
                Direction::Right => {
                    self.stack.pop();
                    if let Some(right) = node.right().node() {
                        self.stack.push(StackEntry {
                            node: right,
                            dir: Direction::Left,
                        });
                    }
                }
            }
        }
    }

    fn fast_forward_to(&mut self, mut offset: usize) {
        self.stack.clear();
        self.chunk = &[];

        let mut cur = self.root.node();
        while let Some(node) = cur {
            let piece = node.piece();
            if offset < node.size_left {
                // Revisit this node's piece after the left subtree.
                self.stack.push(StackEntry {
                    node,
                    dir: Direction::Center,
                });
                cur = node.left().node();
            } else if offset < node.size_left + piece.length {
                self.stack.push(StackEntry {
                    node,
                    dir: Direction::Right,
                });
                let bytes = self.buffers.piece_bytes(piece);
                self.chunk = &bytes[offset - node.size_left..];
                return;
            } else {
                offset -= node.size_left + piece.length;
                cur = node.right().node();
            }
        }
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.chunk.is_empty() {
            self.populate_ptrs();
        }
        let (&byte, rest) = self.chunk.split_first()?;
        self.chunk = rest;
        self.total_offset += 1;
        Some(byte)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl ExactSizeIterator for TreeWalker<'_> {}

/// Backward walker. `offset()` is a caret: the next byte yielded is the
/// one just before it, so a walker at `n` yields `n-1, n-2, .., 0`.
#[derive(Debug)]
pub struct ReverseTreeWalker<'a> {
    buffers: &'a BufferCollection,
    root: &'a RedBlackTree,
    stack: Vec<StackEntry<'a>>,
    total_offset: usize,
    total_content_length: usize,
    chunk: &'a [u8],
}

impl<'a> ReverseTreeWalker<'a> {
    /// Walker with its caret at `offset`, clamped to the document length.
    pub fn new(tree: &'a Tree, offset: usize) -> Self {
        Self::with_view(tree.view(), offset)
    }

    pub fn over_snapshot(snapshot: &'a OwningSnapshot, offset: usize) -> Self {
        Self::with_view(snapshot.view(), offset)
    }

    pub(crate) fn with_view(view: View<'a>, offset: usize) -> Self {
        let mut walker = Self {
            buffers: view.buffers,
            root: view.root,
            stack: Vec::new(),
            total_offset: 0,
            total_content_length: view.root.len(),
            chunk: &[],
        };
        walker.seek(offset);
        walker
    }

    pub fn current(&mut self) -> Option<u8> {
        if self.chunk.is_empty() {
            self.populate_ptrs();
        }
        self.chunk.last().copied()
    }

    /// Unread part of the current piece (in document order), consumed in one step.
    pub fn next_chunk(&mut self) -> Option<&'a [u8]> {
        if self.chunk.is_empty() {
            self.populate_ptrs();
        }
        if self.chunk.is_empty() {
            return None;
        }
        let chunk = mem::take(&mut self.chunk);
        self.total_offset -= chunk.len();
        Some(chunk)
    }

    pub fn seek(&mut self, offset: usize) {
        let offset = offset.min(self.total_content_length);
        self.total_offset = offset;
        self.fast_forward_to(offset);
    }

    pub fn exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn remaining(&self) -> usize {
        self.total_offset
    }

    pub fn offset(&self) -> usize {
        self.total_offset
    }

    fn populate_ptrs(&mut self) {
        while let Some(entry) = self.stack.last_mut() {
            let node = entry.node;
            match entry.dir {
                Direction::Right => {
                    entry.dir = Direction::Center;
                    if let Some(right) = node.right().node() {
                        self.stack.push(StackEntry {
                            node: right,
                            dir: Direction::Right,
                        });
                    }
                }
                Direction::Center => {
                    entry.dir = Direction::Left;
                    self.chunk = self.buffers.piece_bytes(node.piece());
                    if !self.chunk.is_empty() {
                        return;
                    }
                }
                Direction::Left => {
                    self.stack.pop();
                    if let Some(left) = node.left().node() {
                        self.stack.push(StackEntry {
                            node: left,
                            dir: Direction::Right,
                        });
                    }
                }
            }
        }
    }

    fn fast_forward_to(&mut self, caret: usize) {
        self.stack.clear();
        self.chunk = &[];
        if caret == 0 {
            return;
        }

        // The byte just before the caret.
        let mut target = caret - 1;
        let mut cur = self.root.node();
        while let Some(node) = cur {
            let piece = node.piece();
            if target < node.size_left {
                cur = node.left().node();
            } else if target < node.size_left + piece.length {
                self.stack.push(StackEntry {
                    node,
                    dir: Direction::Left,
                });
                let bytes = self.buffers.piece_bytes(piece);
                self.chunk = &bytes[..=target - node.size_left];
                return;
            } else {
                // Revisit this node's piece after the right subtree.
                self.stack.push(StackEntry {
                    node,
                    dir: Direction::Center,
                });
                target -= node.size_left + piece.length;
                cur = node.right().node();
            }
        }
    }
}

impl Iterator for ReverseTreeWalker<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.chunk.is_empty() {
            self.populate_ptrs();
        }
        let (&byte, rest) = self.chunk.split_last()?;
        self.chunk = rest;
        self.total_offset -= 1;
        Some(byte)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl ExactSizeIterator for ReverseTreeWalker<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn edited_tree() -> (Tree, String) {
        let mut tree = Tree::from("The quick brown fox\njumped over the lazy dog");
        tree.insert(9, " and nimble").unwrap();
        tree.insert(0, ">> ").unwrap();
        tree.remove(20, 3).unwrap();
        tree.insert(tree.length(), "!\n").unwrap();
        let text = tree.get_full_text();
        (tree, text)
    }

    #[test]
    fn forward_walk_matches_text() {
        let (tree, text) = edited_tree();
        let walked: Vec<u8> = TreeWalker::new(&tree, 0).collect();
        assert_eq!(walked, text.as_bytes());
    }

    #[test]
    fn forward_walk_from_every_offset() {
        let (tree, text) = edited_tree();
        for offset in 0..=text.len() {
            let mut walker = TreeWalker::new(&tree, offset);
            assert_eq!(walker.remaining(), text.len() - offset);
            assert_eq!(walker.current(), text.as_bytes().get(offset).copied());
            let rest: Vec<u8> = walker.by_ref().collect();
            assert_eq!(rest, &text.as_bytes()[offset..]);
            assert!(walker.exhausted());
            assert_eq!(walker.next(), None);
            assert_eq!(walker.current(), None);
        }
    }

    #[test]
    fn reverse_walk_from_every_offset() {
        let (tree, text) = edited_tree();
        for caret in 0..=text.len() {
            let walker = ReverseTreeWalker::new(&tree, caret);
            assert_eq!(walker.remaining(), caret);
            let walked: Vec<u8> = walker.collect();
            let expected: Vec<u8> = text.as_bytes()[..caret].iter().rev().copied().collect();
            assert_eq!(walked, expected);
        }
    }

    #[test]
    fn seek_restarts_traversal() {
        let (tree, text) = edited_tree();
        let mut walker = TreeWalker::new(&tree, 0);
        walker.next();
        walker.seek(10);
        assert_eq!(walker.offset(), 10);
        assert_eq!(walker.next(), Some(text.as_bytes()[10]));

        let mut rev = ReverseTreeWalker::new(&tree, 0);
        assert!(rev.exhausted());
        rev.seek(5);
        assert_eq!(rev.next(), Some(text.as_bytes()[4]));
        assert_eq!(rev.offset(), 4);
    }

    #[test]
    fn chunks_cover_document() {
        let (tree, text) = edited_tree();
        let mut walker = TreeWalker::new(&tree, 7);
        let mut forward = Vec::new();
        while let Some(chunk) = walker.next_chunk() {
            forward.extend_from_slice(chunk);
        }
        assert_eq!(forward, &text.as_bytes()[7..]);

        let mut rev = ReverseTreeWalker::new(&tree, 30);
        let mut backward: Vec<&[u8]> = Vec::new();
        while let Some(chunk) = rev.next_chunk() {
            backward.push(chunk);
        }
        let joined: Vec<u8> = backward.into_iter().rev().flatten().copied().collect();
        assert_eq!(joined, &text.as_bytes()[..30]);
    }

    #[test]
    fn empty_tree_walkers() {
        let tree = Tree::new();
        assert!(TreeWalker::new(&tree, 0).exhausted());
        assert_eq!(TreeWalker::new(&tree, 3).next(), None);
        assert_eq!(ReverseTreeWalker::new(&tree, 3).next(), None);
    }
}
