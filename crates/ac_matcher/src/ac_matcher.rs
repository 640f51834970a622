//! Multi-pattern byte search with an Aho–Corasick automaton.
//!
//! Patterns are first built into an arena trie with failure links, then
//! packed into a single flat buffer that the scanner reads. A scan reports
//! the first match to end in the text; among patterns ending at the same
//! byte the longest wins.
//!
//! ```
//! use ac_matcher::AhoCorasick;
//!
//! let ac = AhoCorasick::new(["he", "she", "his", "hers"]).unwrap();
//! let m = ac.find(*b"ahishers").unwrap();
//! assert_eq!((m.begin, m.end, m.pattern_idx), (1, 3, 2));
//! ```

mod error;
mod fast;
mod slow;

use log::{debug, warn};
use piece_tree::{OwningSnapshot, Tree, TreeWalker};

pub use error::AhoCorasickError;

use fast::{FAST_ROOT, FastAutomaton};
use slow::SlowAutomaton;

/// Pattern indices are stored 1-based in 16 bits, so a set must hold fewer
/// patterns than this.
pub const PATTERN_LIMIT: usize = 65535;

pub type Result<T> = std::result::Result<T, AhoCorasickError>;

/// A match of `pattern_idx` covering bytes `begin..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match {
    pub begin: usize,
    pub end: usize,
    pub pattern_idx: usize,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end + 1 - self.begin
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Half-open byte range of the match.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.begin..self.end + 1
    }
}

/// Immutable compiled pattern set.
#[derive(Debug, Clone)]
pub struct AhoCorasick {
    fast: FastAutomaton,
    pattern_count: usize,
}

impl AhoCorasick {
    pub fn new<I, P>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let patterns: Vec<P> = patterns.into_iter().collect();
        let slow = SlowAutomaton::build(&patterns).inspect_err(|e| warn!("{e}"))?;
        let fast = FastAutomaton::convert(&slow).inspect_err(|e| warn!("{e}"))?;
        debug!(
            "aho-corasick built: {} patterns, {} states, root fanout {}, {} bytes",
            patterns.len(),
            fast.state_num(),
            fast.root_goto_num(),
            fast.as_bytes().len()
        );
        Ok(Self {
            fast,
            pattern_count: patterns.len(),
        })
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    pub fn state_count(&self) -> usize {
        self.fast.state_num()
    }

    /// Size of the flat runtime buffer.
    pub fn byte_size(&self) -> usize {
        self.fast.as_bytes().len()
    }

    /// The flat runtime buffer itself.
    pub fn as_bytes(&self) -> &[u8] {
        self.fast.as_bytes()
    }

    /// First match in `haystack`; offsets count from its first byte.
    pub fn find<I: IntoIterator<Item = u8>>(&self, haystack: I) -> Option<Match> {
        self.next_match(&mut haystack.into_iter(), &mut 0)
    }

    /// Non-overlapping matches, each scan restarting after the previous
    /// match's end.
    pub fn find_iter<I: IntoIterator<Item = u8>>(&self, haystack: I) -> FindIter<'_, I::IntoIter> {
        FindIter {
            ac: self,
            haystack: haystack.into_iter(),
            pos: 0,
        }
    }

    pub fn find_in_tree(&self, tree: &Tree) -> Option<Match> {
        self.find_in_tree_from(tree, 0)
    }

    /// First match starting at or after `offset`, in document offsets.
    pub fn find_in_tree_from(&self, tree: &Tree, offset: usize) -> Option<Match> {
        let mut walker = TreeWalker::new(tree, offset);
        let mut pos = walker.offset();
        self.next_match(&mut walker, &mut pos)
    }

    pub fn find_in_snapshot(&self, snapshot: &OwningSnapshot) -> Option<Match> {
        self.find(TreeWalker::over_snapshot(snapshot, 0))
    }

    fn next_match<I: Iterator<Item = u8>>(&self, haystack: &mut I, pos: &mut usize) -> Option<Match> {
        let mut state = FAST_ROOT;
        for byte in haystack {
            let idx = *pos;
            *pos += 1;
            state = self.fast.next_state(state, byte);
            if let Some((pattern_idx, depth)) = self.fast.output(state) {
                debug_assert!(depth <= self.fast.depth(state));
                return Some(Match {
                    begin: idx + 1 - depth,
                    end: idx,
                    pattern_idx,
                });
            }
        }
        None
    }
}

/// Iterator returned by [`AhoCorasick::find_iter`].
#[derive(Debug)]
pub struct FindIter<'a, I> {
    ac: &'a AhoCorasick,
    haystack: I,
    pos: usize,
}

impl<I: Iterator<Item = u8>> Iterator for FindIter<'_, I> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        self.ac.next_match(&mut self.haystack, &mut self.pos)
    }
}
