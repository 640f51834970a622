use std::rc::Rc;

/// Sentinel index naming the append-only mod buffer inside a [`BufferCollection`].
pub const MOD_BUFFER: usize = usize::MAX;

pub type LineStarts = Vec<usize>;

/// A position inside one buffer: `line` indexes the buffer's line starts,
/// `column` is the byte distance from that line start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct BufferCursor {
    pub line: usize,
    pub column: usize,
}

impl BufferCursor {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A half-open run `[start, end)` of some buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub buffer_idx: usize,
    pub start: BufferCursor,
    pub end: BufferCursor,
    pub length: usize,
    pub line_feed_cnt: usize,
}

impl Piece {
    pub fn new(
        buffer_idx: usize,
        start: BufferCursor,
        end: BufferCursor,
        length: usize,
        line_feed_cnt: usize,
    ) -> Self {
        Self {
            buffer_idx,
            start,
            end,
            length,
            line_feed_cnt,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CharBuffer {
    buffer: String,
    line_starts: LineStarts,
}

impl CharBuffer {
    pub fn new(buffer: String) -> Self {
        let line_starts = Self::create_line_starts(&buffer);
        Self {
            buffer,
            line_starts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    /// Offsets of every line start in `text`. The first entry is always 0.
    pub fn create_line_starts(text: &str) -> LineStarts {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        line_starts
    }

    /// Cursor just past the last byte.
    pub fn end_cursor(&self) -> BufferCursor {
        let last_line = self.line_starts.len() - 1;
        BufferCursor::new(last_line, self.buffer.len() - self.line_starts[last_line])
    }

    /// Append `text`, extending the line starts. Bytes already stored never move.
    fn append(&mut self, text: &str) {
        let base = self.buffer.len();
        self.line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| base + i + 1),
        );
        self.buffer.push_str(text);
    }
}

impl From<&str> for CharBuffer {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

/// The immutable original buffers plus the single append-only mod buffer.
#[derive(Debug, Clone)]
pub struct BufferCollection {
    orig_buffers: Vec<Rc<CharBuffer>>,
    mod_buffer: CharBuffer,
}

impl BufferCollection {
    pub fn new(orig_buffers: Vec<Rc<CharBuffer>>) -> Self {
        Self {
            orig_buffers,
            mod_buffer: CharBuffer::new(String::new()),
        }
    }

    pub fn orig_buffers(&self) -> &[Rc<CharBuffer>] {
        &self.orig_buffers
    }

    pub fn mod_buffer(&self) -> &CharBuffer {
        &self.mod_buffer
    }

    pub fn buffer_at(&self, index: usize) -> &CharBuffer {
        if index == MOD_BUFFER {
            &self.mod_buffer
        } else {
            &self.orig_buffers[index]
        }
    }

    pub fn buffer_offset(&self, index: usize, cursor: BufferCursor) -> usize {
        self.buffer_at(index).line_starts[cursor.line] + cursor.column
    }

    /// The bytes a piece covers.
    pub fn piece_bytes(&self, piece: &Piece) -> &[u8] {
        let buffer = self.buffer_at(piece.buffer_idx);
        let first = self.buffer_offset(piece.buffer_idx, piece.start);
        let last = self.buffer_offset(piece.buffer_idx, piece.end);
        &buffer.buffer.as_bytes()[first..last]
    }

    /// Append `text` to the mod buffer and return the piece describing it.
    /// `start` must be the mod buffer's end cursor before the append.
    pub(crate) fn build_piece(&mut self, text: &str) -> Piece {
        let start = self.mod_buffer.end_cursor();
        self.mod_buffer.append(text);
        let end = self.mod_buffer.end_cursor();
        Piece::new(
            MOD_BUFFER,
            start,
            end,
            text.len(),
            Self::line_feed_count(start, end),
        )
    }

    /// Every line start after the first is preceded by exactly one `'\n'`,
    /// so the count is the line distance.
    pub fn line_feed_count(start: BufferCursor, end: BufferCursor) -> usize {
        end.line - start.line
    }

    /// Cursor of the byte `remainder` bytes into `piece`.
    pub fn buffer_position(&self, piece: &Piece, remainder: usize) -> BufferCursor {
        let starts = &self.buffer_at(piece.buffer_idx).line_starts;
        let offset = starts[piece.start.line] + piece.start.column + remainder;
        let lines = &starts[piece.start.line..=piece.end.line];
        // starts[piece.start.line] <= offset, so the partition point is at least 1.
        let line = piece.start.line + lines.partition_point(|&s| s <= offset) - 1;
        BufferCursor::new(line, offset - starts[line])
    }

    /// Keep the part of `piece` before `pos`.
    pub fn trim_piece_right(&self, piece: &Piece, pos: BufferCursor) -> Piece {
        let orig_end = self.buffer_offset(piece.buffer_idx, piece.end);
        let new_end = self.buffer_offset(piece.buffer_idx, pos);
        Piece {
            end: pos,
            length: piece.length - (orig_end - new_end),
            line_feed_cnt: Self::line_feed_count(piece.start, pos),
            ..*piece
        }
    }

    /// Keep the part of `piece` from `pos` on.
    pub fn trim_piece_left(&self, piece: &Piece, pos: BufferCursor) -> Piece {
        let orig_start = self.buffer_offset(piece.buffer_idx, piece.start);
        let new_start = self.buffer_offset(piece.buffer_idx, pos);
        Piece {
            start: pos,
            length: piece.length - (new_start - orig_start),
            line_feed_cnt: Self::line_feed_count(pos, piece.end),
            ..*piece
        }
    }

    /// Cut `[first, last)` out of `piece`, returning what is left on each side.
    pub fn shrink_piece(
        &self,
        piece: &Piece,
        first: BufferCursor,
        last: BufferCursor,
    ) -> (Piece, Piece) {
        (
            self.trim_piece_right(piece, first),
            self.trim_piece_left(piece, last),
        )
    }

    /// Bytes from the start of `piece` through its `index`-th newline
    /// (0-based), or the whole piece if it has no such newline.
    pub(crate) fn accumulate_value(&self, piece: &Piece, index: usize) -> usize {
        let starts = &self.buffer_at(piece.buffer_idx).line_starts;
        let expected_start = piece.start.line + index + 1;
        let first = starts[piece.start.line] + piece.start.column;
        if expected_start > piece.end.line {
            return starts[piece.end.line] + piece.end.column - first;
        }
        starts[expected_start] - first
    }
}
