use std::io::{self, Read};

use log::debug;
use piece_tree::CharBuffer;

use crate::buffer::TextBuffer;

/// Bytes read per original buffer when loading.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug)]
pub struct TextBufferBuilder {
    chunks: Vec<CharBuffer>,
    chunk_size: usize,
}

impl Default for TextBufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBufferBuilder {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Read granularity for [`read_from`](Self::read_from); zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Accept a chunk of text (may include multiple lines).
    pub fn accept_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.chunks.push(CharBuffer::from(chunk));
    }

    /// Finish building and return a `TextBuffer`.
    pub fn finish(self) -> TextBuffer {
        TextBuffer::from_chunks(self.chunks)
    }

    /// Drain `reader` into chunks of about `chunk_size` bytes. A UTF-8
    /// sequence cut by a read is carried into the next chunk; invalid bytes
    /// become U+FFFD.
    pub fn read_from<R: Read>(mut self, mut reader: R) -> io::Result<TextBuffer> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut carry: Vec<u8> = Vec::new();
        let mut total = 0;

        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            total += n;
            carry.extend_from_slice(&buf[..n]);

            let mut chunk = String::new();
            let mut rest = carry.as_slice();
            loop {
                match std::str::from_utf8(rest) {
                    Ok(s) => {
                        chunk.push_str(s);
                        rest = &[];
                        break;
                    }
                    Err(e) => {
                        let (valid, after) = rest.split_at(e.valid_up_to());
                        chunk.push_str(&String::from_utf8_lossy(valid));
                        match e.error_len() {
                            Some(bad) => {
                                chunk.push(char::REPLACEMENT_CHARACTER);
                                rest = &after[bad..];
                            }
                            // Incomplete sequence at the end: wait for more bytes.
                            None => {
                                rest = after;
                                break;
                            }
                        }
                    }
                }
            }
            carry = rest.to_vec();
            self.accept_chunk(&chunk);
        }

        if !carry.is_empty() {
            self.accept_chunk(&String::from_utf8_lossy(&carry));
        }
        debug!("read {total} bytes into {} chunks", self.chunks.len());
        Ok(self.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_concatenate() {
        let mut builder = TextBufferBuilder::new();
        builder.accept_chunk("ab\n");
        builder.accept_chunk("");
        builder.accept_chunk("cd");
        let buf = builder.finish();
        assert_eq!(buf.get_text(), "ab\ncd");
        assert_eq!(buf.get_line_count(), 2);
    }

    #[test]
    fn multibyte_split_across_reads() {
        let text = "héllo wörld, 你好\n🦀";
        for size in 1..8 {
            let buf = TextBufferBuilder::new()
                .with_chunk_size(size)
                .read_from(text.as_bytes())
                .unwrap();
            assert_eq!(buf.get_text(), text, "chunk size {size}");
        }
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let bytes = b"ok\xffthen\xe4";
        let buf = TextBufferBuilder::new()
            .with_chunk_size(3)
            .read_from(&bytes[..])
            .unwrap();
        assert_eq!(buf.get_text(), "ok\u{fffd}then\u{fffd}");
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        let builder = TextBufferBuilder::new().with_chunk_size(0);
        assert_eq!(builder.chunk_size(), 1);
        assert_eq!(TextBufferBuilder::default().chunk_size(), DEFAULT_CHUNK_SIZE);
    }
}
