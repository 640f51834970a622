use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use log::debug;
use piece_tree::TreeWalker;

use crate::TextBufferBuilder;
use crate::buffer::TextBuffer;
use crate::error::Result;

/// Load a file with the default chunk size.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<TextBuffer> {
    TextBufferBuilder::new().load_from_path(path)
}

/// Write the document piece by piece, without assembling it in memory.
pub fn save_to_path<P: AsRef<Path>>(buffer: &TextBuffer, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    let mut walker = TreeWalker::new(buffer.tree(), 0);
    while let Some(chunk) = walker.next_chunk() {
        writer.write_all(chunk)?;
    }
    writer.flush()?;
    debug!("saved {} bytes to {}", buffer.get_length(), path.display());
    Ok(())
}

impl TextBufferBuilder {
    pub fn load_from_path<P: AsRef<Path>>(self, path: P) -> Result<TextBuffer> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let buffer = self.read_from(reader)?;
        debug!("loaded {} bytes from {}", buffer.get_length(), path.display());
        Ok(buffer)
    }
}

impl TextBuffer {
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_to_path(self, path)
    }
}
