use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AhoCorasickError {
    #[error("{count} patterns given, the automaton holds fewer than {limit}")]
    TooManyPatterns { count: usize, limit: usize },

    #[error("pattern {index} is empty")]
    EmptyPattern { index: usize },

    #[error("automaton would need {bytes} bytes, past 32-bit offsets")]
    TooLarge { bytes: usize },
}
