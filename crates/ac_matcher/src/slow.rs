//! Pointer-free trie used while building the automaton.
//!
//! States live in one arena indexed by [`StateId`]; state 0 is the root.

use std::collections::{BTreeMap, VecDeque};

use crate::AhoCorasickError;
use crate::PATTERN_LIMIT;

pub(crate) type StateId = usize;

pub(crate) const ROOT: StateId = 0;

/// The pattern reported when a scan reaches a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Output {
    pub(crate) pattern_idx: usize,
    pub(crate) depth: usize,
}

#[derive(Debug, Default)]
pub(crate) struct SlowState {
    // Sorted by input byte.
    pub(crate) goto: BTreeMap<u8, StateId>,
    pub(crate) fail_link: StateId,
    pub(crate) depth: usize,
    // Pattern ending exactly here.
    pub(crate) terminal: Option<usize>,
    // Deepest pattern ending here or at a failure-link suffix.
    pub(crate) output: Option<Output>,
}

#[derive(Debug)]
pub(crate) struct SlowAutomaton {
    states: Vec<SlowState>,
}

impl SlowAutomaton {
    pub(crate) fn build<P: AsRef<[u8]>>(patterns: &[P]) -> Result<Self, AhoCorasickError> {
        if patterns.len() >= PATTERN_LIMIT {
            return Err(AhoCorasickError::TooManyPatterns {
                count: patterns.len(),
                limit: PATTERN_LIMIT,
            });
        }

        let mut automaton = Self {
            states: vec![SlowState::default()],
        };
        for (index, pattern) in patterns.iter().enumerate() {
            let pattern = pattern.as_ref();
            if pattern.is_empty() {
                return Err(AhoCorasickError::EmptyPattern { index });
            }
            automaton.add_pattern(pattern, index);
        }
        automaton.compute_fail_links();
        Ok(automaton)
    }

    pub(crate) fn states(&self) -> &[SlowState] {
        &self.states
    }

    pub(crate) fn root(&self) -> &SlowState {
        &self.states[ROOT]
    }

    fn add_pattern(&mut self, pattern: &[u8], index: usize) {
        let mut cur = ROOT;
        for &byte in pattern {
            cur = match self.states[cur].goto.get(&byte) {
                Some(&next) => next,
                None => {
                    let next = self.states.len();
                    let depth = self.states[cur].depth + 1;
                    self.states.push(SlowState {
                        depth,
                        ..SlowState::default()
                    });
                    self.states[cur].goto.insert(byte, next);
                    next
                }
            };
        }
        // A repeated pattern keeps its first index.
        let state = &mut self.states[cur];
        state.terminal.get_or_insert(index);
    }

    fn compute_fail_links(&mut self) {
        let mut queue = VecDeque::new();

        let root_kids: Vec<StateId> = self.states[ROOT].goto.values().copied().collect();
        for kid in root_kids {
            let state = &mut self.states[kid];
            state.fail_link = ROOT;
            state.output = state.terminal.map(|pattern_idx| Output {
                pattern_idx,
                depth: state.depth,
            });
            queue.push_back(kid);
        }

        while let Some(cur) = queue.pop_front() {
            let kids: Vec<(u8, StateId)> =
                self.states[cur].goto.iter().map(|(&b, &s)| (b, s)).collect();
            for (byte, kid) in kids {
                let mut fail = self.states[cur].fail_link;
                let link = loop {
                    if let Some(&next) = self.states[fail].goto.get(&byte) {
                        break next;
                    }
                    if fail == ROOT {
                        break ROOT;
                    }
                    fail = self.states[fail].fail_link;
                };

                let inherited = self.states[link].output;
                let state = &mut self.states[kid];
                state.fail_link = link;
                state.output = state
                    .terminal
                    .map(|pattern_idx| Output {
                        pattern_idx,
                        depth: state.depth,
                    })
                    .or(inherited);
                queue.push_back(kid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(automaton: &SlowAutomaton, path: &[u8]) -> StateId {
        path.iter()
            .fold(ROOT, |s, b| automaton.states()[s].goto[b])
    }

    #[test]
    fn trie_shape() {
        let automaton = SlowAutomaton::build(&["he", "she", "his", "hers"]).unwrap();
        // root, h, he, s, sh, she, hi, his, her, hers
        assert_eq!(automaton.states().len(), 10);
        assert_eq!(automaton.root().goto.len(), 2);
        let hers = walk(&automaton, b"hers");
        assert_eq!(automaton.states()[hers].depth, 4);
        assert_eq!(automaton.states()[hers].terminal, Some(3));
    }

    #[test]
    fn fail_links_point_at_longest_suffix() {
        let automaton = SlowAutomaton::build(&["he", "she", "his", "hers"]).unwrap();
        let states = automaton.states();
        assert_eq!(states[walk(&automaton, b"she")].fail_link, walk(&automaton, b"he"));
        assert_eq!(states[walk(&automaton, b"sh")].fail_link, walk(&automaton, b"h"));
        assert_eq!(states[walk(&automaton, b"his")].fail_link, walk(&automaton, b"s"));
        assert_eq!(states[walk(&automaton, b"hers")].fail_link, walk(&automaton, b"s"));
        assert_eq!(states[walk(&automaton, b"h")].fail_link, ROOT);
    }

    #[test]
    fn outputs_follow_fail_links() {
        let automaton = SlowAutomaton::build(&["abcd", "bc", "c"]).unwrap();
        let states = automaton.states();
        // "abc" is not a pattern but ends with "bc".
        assert_eq!(
            states[walk(&automaton, b"abc")].output,
            Some(Output { pattern_idx: 1, depth: 2 })
        );
        assert_eq!(
            states[walk(&automaton, b"b")].output,
            None
        );
    }

    #[test]
    fn duplicate_pattern_keeps_first_index() {
        let automaton = SlowAutomaton::build(&["ab", "x", "ab"]).unwrap();
        assert_eq!(automaton.states()[walk(&automaton, b"ab")].terminal, Some(0));
    }

    #[test]
    fn rejects_bad_pattern_sets() {
        assert_eq!(
            SlowAutomaton::build(&["a", ""]).unwrap_err(),
            AhoCorasickError::EmptyPattern { index: 1 }
        );
        let many = vec!["a"; PATTERN_LIMIT];
        assert_eq!(
            SlowAutomaton::build(&many).unwrap_err(),
            AhoCorasickError::TooManyPatterns {
                count: PATTERN_LIMIT,
                limit: PATTERN_LIMIT
            }
        );
    }
}
