//! Line framing of the decoded text stream.
//!
//! The server writes one event per line, either in SSE form
//!
//! ```text
//! data: {"result":"Hel","is_end":false}
//! ```
//!
//! or as a bare JSON object on its own line. Lines may be split anywhere by
//! the transport, so [`FrameSplitter`] buffers text until it sees the line
//! terminator. Blank lines, `event:`/`id:` fields and `:` comments are
//! dropped.

use chatwire_types::StreamError;

/// How a frame was introduced on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A `data:`-prefixed line.
    Data,
    /// A bare JSON line starting with `{`.
    RawJson,
}

/// One complete logical server event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// How the frame was introduced.
    pub kind: FrameKind,
    /// The event payload with the prefix and surrounding whitespace removed.
    pub payload: String,
}

/// Splits decoded text into frames, buffering partial lines.
#[derive(Debug)]
pub struct FrameSplitter {
    buf: String,
    max_frame_bytes: usize,
}

impl FrameSplitter {
    /// Create a splitter that refuses to buffer more than `max_frame_bytes`
    /// of a single line.
    #[must_use]
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: String::new(),
            max_frame_bytes,
        }
    }

    /// Append decoded text and return every frame completed by it.
    pub fn push(&mut self, text: &str) -> Result<Vec<Frame>, StreamError> {
        // The retained tail never contains a terminator, so only the new text
        // needs scanning.
        let mut search_from = self.buf.len();
        self.buf.push_str(text);

        let mut frames = Vec::new();
        let mut line_start = 0;
        while let Some(pos) = self.buf[search_from..].find('\n') {
            let line_end = search_from + pos;
            let line = &self.buf[line_start..line_end];
            check_size(line.len(), self.max_frame_bytes)?;
            if let Some(frame) = recognize(line) {
                frames.push(frame);
            }
            line_start = line_end + 1;
            search_from = line_start;
        }
        self.buf.drain(..line_start);

        check_size(self.buf.len(), self.max_frame_bytes)?;
        Ok(frames)
    }

    /// Flush the final line at end of stream.
    ///
    /// The end of the stream terminates a last line that has no newline.
    pub fn finish(&mut self) -> Option<Frame> {
        let rest = std::mem::take(&mut self.buf);
        recognize(&rest)
    }

    /// Bytes currently buffered for an incomplete line.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

fn check_size(len: usize, limit: usize) -> Result<(), StreamError> {
    if len > limit {
        return Err(StreamError::FrameTooLarge {
            limit,
            buffered: len,
        });
    }
    Ok(())
}

/// Classify one line (without its terminator).
fn recognize(line: &str) -> Option<Frame> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    if let Some(data) = line.strip_prefix("data:") {
        let payload = data.trim();
        if payload.is_empty() {
            return None;
        }
        return Some(Frame {
            kind: FrameKind::Data,
            payload: payload.to_string(),
        });
    }

    if line.starts_with('{') {
        return Some(Frame {
            kind: FrameKind::RawJson,
            payload: line.trim_end().to_string(),
        });
    }

    if !line.trim().is_empty() {
        tracing::trace!(line = %line, "discarding non-data line");
    }
    None
}
