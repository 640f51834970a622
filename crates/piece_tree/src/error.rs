use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PieceTreeError {
    #[error("insert offset {offset} is past the end of the document (length {len})")]
    InvalidOffset { offset: usize, len: usize },

    #[error("offset {offset} is out of range (length {len})")]
    OutOfRange { offset: usize, len: usize },

    #[error("offset {offset} splits a UTF-8 sequence")]
    NotCharBoundary { offset: usize },
}
