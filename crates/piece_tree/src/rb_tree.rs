//! Persistent red-black tree of pieces.
//!
//! Nodes are never mutated once built. Every insert or remove copies the
//! path from the root to the edited position and shares everything else, so
//! an old root stays a valid, unchanged document. Balancing follows the
//! functional formulation (Okasaki insertion, Kahrs deletion).

use std::rc::Rc;

use crate::buffer::Piece;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeColor {
    Red,
    Black,
}

#[derive(Debug)]
pub struct TreeNode {
    pub(crate) piece: Piece,
    pub(crate) color: NodeColor,
    pub(crate) left: RedBlackTree,
    pub(crate) right: RedBlackTree,
    pub(crate) size_left: usize,
    pub(crate) lf_left: usize,
    subtree_len: usize,
    subtree_lf: usize,
}

impl TreeNode {
    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    pub fn color(&self) -> NodeColor {
        self.color
    }

    pub fn left(&self) -> &RedBlackTree {
        &self.left
    }

    pub fn right(&self) -> &RedBlackTree {
        &self.right
    }
}

#[derive(Debug, Clone, Default)]
pub struct RedBlackTree {
    root: Option<Rc<TreeNode>>,
}

fn make(color: NodeColor, left: RedBlackTree, piece: Piece, right: RedBlackTree) -> RedBlackTree {
    let size_left = left.len();
    let lf_left = left.line_feed_count();
    let subtree_len = size_left + piece.length + right.len();
    let subtree_lf = lf_left + piece.line_feed_cnt + right.line_feed_count();
    RedBlackTree {
        root: Some(Rc::new(TreeNode {
            piece,
            color,
            left,
            right,
            size_left,
            lf_left,
            subtree_len,
            subtree_lf,
        })),
    }
}

impl RedBlackTree {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn node(&self) -> Option<&TreeNode> {
        self.root.as_deref()
    }

    /// Total bytes in this subtree.
    pub fn len(&self) -> usize {
        self.node().map_or(0, |n| n.subtree_len)
    }

    /// Total `'\n'` in this subtree.
    pub fn line_feed_count(&self) -> usize {
        self.node().map_or(0, |n| n.subtree_lf)
    }

    /// Whether both trees are the same allocation (or both empty).
    pub fn ptr_eq(&self, other: &RedBlackTree) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    fn red_node(&self) -> Option<&TreeNode> {
        self.node().filter(|n| n.color == NodeColor::Red)
    }

    fn black_node(&self) -> Option<&TreeNode> {
        self.node().filter(|n| n.color == NodeColor::Black)
    }

    fn is_red(&self) -> bool {
        self.red_node().is_some()
    }

    fn paint(&self, color: NodeColor) -> RedBlackTree {
        match self.node() {
            None => RedBlackTree::new(),
            Some(n) if n.color == color => self.clone(),
            Some(n) => make(color, n.left.clone(), n.piece, n.right.clone()),
        }
    }

    /// Insert `piece` so that it starts at document offset `at`.
    /// `at` must be a piece boundary.
    pub fn insert(&self, piece: Piece, at: usize) -> RedBlackTree {
        self.ins(piece, at, 0).paint(NodeColor::Black)
    }

    fn ins(&self, piece: Piece, at: usize, total: usize) -> RedBlackTree {
        let Some(node) = self.node() else {
            return make(NodeColor::Red, RedBlackTree::new(), piece, RedBlackTree::new());
        };
        let node_start = total + node.size_left;
        if at <= node_start {
            let left = node.left.ins(piece, at, total);
            match node.color {
                NodeColor::Black => balance(left, node.piece, node.right.clone()),
                NodeColor::Red => make(NodeColor::Red, left, node.piece, node.right.clone()),
            }
        } else {
            let right = node.right.ins(piece, at, node_start + node.piece.length);
            match node.color {
                NodeColor::Black => balance(node.left.clone(), node.piece, right),
                NodeColor::Red => make(NodeColor::Red, node.left.clone(), node.piece, right),
            }
        }
    }

    /// Remove the piece starting at document offset `at`.
    pub fn remove(&self, at: usize) -> RedBlackTree {
        self.rem(at, 0).paint(NodeColor::Black)
    }

    fn rem(&self, at: usize, total: usize) -> RedBlackTree {
        let Some(node) = self.node() else {
            return RedBlackTree::new();
        };
        let node_start = total + node.size_left;
        if at < node_start {
            let left = node.left.rem(at, total);
            if node.left.black_node().is_some() {
                bal_left(left, node.piece, node.right.clone())
            } else {
                make(NodeColor::Red, left, node.piece, node.right.clone())
            }
        } else if at > node_start {
            let right = node.right.rem(at, node_start + node.piece.length);
            if node.right.black_node().is_some() {
                bal_right(node.left.clone(), node.piece, right)
            } else {
                make(NodeColor::Red, node.left.clone(), node.piece, right)
            }
        } else {
            fuse(node.left.clone(), node.right.clone())
        }
    }

    /// Pieces in document order.
    pub fn pieces(&self) -> Vec<Piece> {
        let mut out = Vec::new();
        self.for_each_inorder(|node| {
            out.push(node.piece);
            true
        });
        out
    }

    /// In-order visit; `f` returns `false` to stop early.
    pub fn for_each_inorder<F: FnMut(&TreeNode) -> bool>(&self, mut f: F) {
        let mut stack: Vec<&TreeNode> = Vec::new();
        let mut cur = self.node();

        while cur.is_some() || !stack.is_empty() {
            while let Some(c) = cur {
                stack.push(c);
                cur = c.left.node();
            }

            let Some(node) = stack.pop() else { break };
            if !f(node) {
                break;
            }
            cur = node.right.node();
        }
    }

    /// Black height if every red-black property and aggregate holds.
    pub fn check_invariants(&self) -> Result<usize, String> {
        if self.is_red() {
            return Err("root is red".to_owned());
        }
        Self::check_node(self)
    }

    fn check_node(tree: &RedBlackTree) -> Result<usize, String> {
        let Some(node) = tree.node() else {
            return Ok(1);
        };
        if node.color == NodeColor::Red && (node.left.is_red() || node.right.is_red()) {
            return Err(format!("red node with red child at piece {:?}", node.piece));
        }
        if node.size_left != node.left.len() || node.lf_left != node.left.line_feed_count() {
            return Err(format!("stale left aggregates at piece {:?}", node.piece));
        }
        let left = Self::check_node(&node.left)?;
        let right = Self::check_node(&node.right)?;
        if left != right {
            return Err(format!(
                "black height mismatch: left={left}, right={right}"
            ));
        }
        Ok(left + usize::from(node.color == NodeColor::Black))
    }
}

fn balance(left: RedBlackTree, piece: Piece, right: RedBlackTree) -> RedBlackTree {
    use NodeColor::{Black, Red};

    if left.is_red() && right.is_red() {
        return make(Red, left.paint(Black), piece, right.paint(Black));
    }
    if let Some(l) = left.red_node() {
        if let Some(ll) = l.left.red_node() {
            return make(
                Red,
                make(Black, ll.left.clone(), ll.piece, ll.right.clone()),
                l.piece,
                make(Black, l.right.clone(), piece, right),
            );
        }
        if let Some(lr) = l.right.red_node() {
            return make(
                Red,
                make(Black, l.left.clone(), l.piece, lr.left.clone()),
                lr.piece,
                make(Black, lr.right.clone(), piece, right),
            );
        }
    }
    if let Some(r) = right.red_node() {
        if let Some(rr) = r.right.red_node() {
            return make(
                Red,
                make(Black, left, piece, r.left.clone()),
                r.piece,
                make(Black, rr.left.clone(), rr.piece, rr.right.clone()),
            );
        }
        if let Some(rl) = r.left.red_node() {
            return make(
                Red,
                make(Black, left, piece, rl.left.clone()),
                rl.piece,
                make(Black, rl.right.clone(), r.piece, r.right.clone()),
            );
        }
    }
    make(Black, left, piece, right)
}

// `left` lost one black level.
fn bal_left(left: RedBlackTree, piece: Piece, right: RedBlackTree) -> RedBlackTree {
    use NodeColor::{Black, Red};

    if left.is_red() {
        return make(Red, left.paint(Black), piece, right);
    }
    if right.black_node().is_some() {
        return balance(left, piece, right.paint(Red));
    }
    if let Some(r) = right.red_node() {
        if let Some(rl) = r.left.black_node() {
            return make(
                Red,
                make(Black, left, piece, rl.left.clone()),
                rl.piece,
                balance(rl.right.clone(), r.piece, r.right.paint(Red)),
            );
        }
    }
    make(Black, left, piece, right)
}

// `right` lost one black level.
fn bal_right(left: RedBlackTree, piece: Piece, right: RedBlackTree) -> RedBlackTree {
    use NodeColor::{Black, Red};

    if right.is_red() {
        return make(Red, left, piece, right.paint(Black));
    }
    if left.black_node().is_some() {
        return balance(left.paint(Red), piece, right);
    }
    if let Some(l) = left.red_node() {
        if let Some(lr) = l.right.black_node() {
            return make(
                Red,
                balance(l.left.paint(Red), l.piece, lr.left.clone()),
                lr.piece,
                make(Black, lr.right.clone(), piece, right),
            );
        }
    }
    make(Black, left, piece, right)
}

// Join two subtrees of equal black height whose pieces are adjacent.
fn fuse(left: RedBlackTree, right: RedBlackTree) -> RedBlackTree {
    use NodeColor::{Black, Red};

    let (l, r) = match (&left.root, &right.root) {
        (Some(l), Some(r)) => (Rc::clone(l), Rc::clone(r)),
        (None, _) => return right,
        (_, None) => return left,
    };

    match (l.color, r.color) {
        (Black, Red) => make(Red, fuse(left, r.left.clone()), r.piece, r.right.clone()),
        (Red, Black) => make(Red, l.left.clone(), l.piece, fuse(l.right.clone(), right)),
        (Red, Red) => {
            let s = fuse(l.right.clone(), r.left.clone());
            match s.red_node() {
                Some(sn) => make(
                    Red,
                    make(Red, l.left.clone(), l.piece, sn.left.clone()),
                    sn.piece,
                    make(Red, sn.right.clone(), r.piece, r.right.clone()),
                ),
                None => make(
                    Red,
                    l.left.clone(),
                    l.piece,
                    make(Red, s, r.piece, r.right.clone()),
                ),
            }
        }
        (Black, Black) => {
            let s = fuse(l.right.clone(), r.left.clone());
            match s.red_node() {
                Some(sn) => make(
                    Red,
                    make(Black, l.left.clone(), l.piece, sn.left.clone()),
                    sn.piece,
                    make(Black, sn.right.clone(), r.piece, r.right.clone()),
                ),
                None => bal_left(
                    l.left.clone(),
                    l.piece,
                    make(Black, s, r.piece, r.right.clone()),
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferCursor;

    // Pieces of length 1 tagged by buffer index so order is easy to read back.
    fn tagged(tag: usize) -> Piece {
        Piece::new(tag, BufferCursor::new(0, 0), BufferCursor::new(0, 1), 1, 0)
    }

    fn tags(tree: &RedBlackTree) -> Vec<usize> {
        tree.pieces().iter().map(|p| p.buffer_idx).collect()
    }

    #[test]
    fn append_keeps_order_and_balance() {
        let mut tree = RedBlackTree::new();
        for i in 0..100 {
            tree = tree.insert(tagged(i), i);
            tree.check_invariants().unwrap();
        }
        assert_eq!(tags(&tree), (0..100).collect::<Vec<_>>());
        assert_eq!(tree.len(), 100);
    }

    #[test]
    fn prepend_and_middle_inserts() {
        let mut tree = RedBlackTree::new();
        for i in 0..50 {
            tree = tree.insert(tagged(i), 0);
        }
        tree = tree.insert(tagged(1000), 25);
        tree.check_invariants().unwrap();

        let mut expected: Vec<usize> = (0..50).rev().collect();
        expected.insert(25, 1000);
        assert_eq!(tags(&tree), expected);
    }

    #[test]
    fn remove_keeps_invariants() {
        let mut tree = RedBlackTree::new();
        for i in 0..64 {
            tree = tree.insert(tagged(i), i);
        }
        let mut expected: Vec<usize> = (0..64).collect();

        // Remove every third piece, from the back so offsets stay put.
        for pos in (0..64).rev().filter(|p| p % 3 == 0) {
            tree = tree.remove(pos);
            expected.remove(pos);
            tree.check_invariants().unwrap();
        }
        assert_eq!(tags(&tree), expected);

        while !tree.is_empty() {
            tree = tree.remove(0);
            tree.check_invariants().unwrap();
        }
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn old_roots_are_unchanged() {
        let mut tree = RedBlackTree::new();
        for i in 0..10 {
            tree = tree.insert(tagged(i), i);
        }
        let before = tree.clone();
        let after = tree.remove(4).insert(tagged(99), 0);

        assert_eq!(tags(&before), (0..10).collect::<Vec<_>>());
        assert_eq!(tags(&after), vec![99, 0, 1, 2, 3, 5, 6, 7, 8, 9]);
        assert!(!before.ptr_eq(&after));
    }
}
