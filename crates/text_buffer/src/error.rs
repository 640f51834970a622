use ac_matcher::AhoCorasickError;
use piece_tree::PieceTreeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextBufferError {
    #[error(transparent)]
    Edit(#[from] PieceTreeError),

    #[error("invalid search patterns: {0}")]
    Pattern(#[from] AhoCorasickError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TextBufferError>;
