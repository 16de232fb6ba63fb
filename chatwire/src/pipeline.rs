//! Bytes to deltas: the decode, frame and parse stages chained together.

use chatwire_types::{Delta, StreamError};

use crate::decoder::ByteDecoder;
use crate::frame::{Frame, FrameSplitter};
use crate::parser::parse_event;

/// Runs one chunk at a time through [`ByteDecoder`], [`FrameSplitter`] and
/// [`parse_event`].
///
/// Frames that fail to parse are logged and skipped; they never fail the
/// pipeline.
#[derive(Debug)]
pub struct ChunkPipeline {
    decoder: ByteDecoder,
    splitter: FrameSplitter,
    skipped: usize,
}

impl ChunkPipeline {
    /// Create a pipeline whose frames may not exceed `max_frame_bytes`.
    #[must_use]
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            decoder: ByteDecoder::new(),
            splitter: FrameSplitter::new(max_frame_bytes),
            skipped: 0,
        }
    }

    /// Process one chunk and return the deltas it completed, in order.
    pub fn ingest(&mut self, chunk: &[u8]) -> Result<Vec<Delta>, StreamError> {
        let text = self.decoder.feed(chunk)?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let frames = self.splitter.push(&text)?;
        Ok(self.parse_frames(frames))
    }

    /// Drain everything left once the byte stream has ended.
    pub fn finish(&mut self) -> Result<Vec<Delta>, StreamError> {
        let text = self.decoder.flush()?;
        let mut frames = self.splitter.push(&text)?;
        frames.extend(self.splitter.finish());
        Ok(self.parse_frames(frames))
    }

    /// How many frames were skipped as unparseable.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn parse_frames(&mut self, frames: Vec<Frame>) -> Vec<Delta> {
        let mut deltas = Vec::with_capacity(frames.len());
        for frame in frames {
            match parse_event(&frame.payload) {
                Ok(delta) => deltas.push(delta),
                Err(error) => {
                    self.skipped += 1;
                    tracing::debug!(kind = ?frame.kind, %error, "skipping unparseable frame");
                }
            }
        }
        deltas
    }
}
