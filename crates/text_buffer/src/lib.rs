mod buffer;
mod buffer_builder;
mod error;
mod io;

pub use crate::buffer::{Position, TextBuffer};
pub use crate::buffer_builder::{DEFAULT_CHUNK_SIZE, TextBufferBuilder};
pub use crate::error::TextBufferError;
pub use crate::io::{load_from_path, save_to_path};
