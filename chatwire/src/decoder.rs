//! Incremental UTF-8 decoding of response body chunks.
//!
//! Transports hand out chunks at arbitrary byte boundaries, so a multi-byte
//! character may arrive split across two reads. [`ByteDecoder`] holds back
//! the unfinished tail of a chunk until the rest of the sequence shows up,
//! and never substitutes replacement characters.

use chatwire_types::DecodeError;

const BOM: char = '\u{feff}';

/// Turns a sequence of byte chunks into UTF-8 text fragments.
#[derive(Debug, Default)]
pub struct ByteDecoder {
    /// Bytes of a multi-byte sequence that has not been completed yet.
    pending: Vec<u8>,
    /// Total bytes decoded so far, for error offsets.
    decoded: usize,
    /// Whether the leading byte order mark check has run.
    bom_checked: bool,
}

impl ByteDecoder {
    /// Create a decoder at the start of a stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk.
    ///
    /// Returns all text that is complete after this chunk. A trailing
    /// incomplete sequence is kept for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        let joined: Vec<u8>;
        let bytes: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) if e.error_len().is_some() => {
                return Err(DecodeError::InvalidSequence {
                    offset: self.decoded + e.valid_up_to(),
                });
            }
            Err(e) => {
                // Incomplete sequence at the end: keep it for later.
                let (valid, tail) = bytes.split_at(e.valid_up_to());
                self.pending.extend_from_slice(tail);
                std::str::from_utf8(valid).map_err(|e| DecodeError::InvalidSequence {
                    offset: self.decoded + e.valid_up_to(),
                })?
            }
        };
        self.decoded += text.len();

        Ok(self.strip_bom(text).to_owned())
    }

    /// Signal the end of the stream.
    ///
    /// Fails if the stream stopped in the middle of a multi-byte sequence.
    pub fn flush(&mut self) -> Result<String, DecodeError> {
        if self.pending.is_empty() {
            return Ok(String::new());
        }
        let pending = self.pending.len();
        self.pending.clear();
        Err(DecodeError::Truncated { pending })
    }

    /// Number of bytes currently held back.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn strip_bom<'a>(&mut self, text: &'a str) -> &'a str {
        if self.bom_checked || text.is_empty() {
            return text;
        }
        self.bom_checked = true;
        text.strip_prefix(BOM).unwrap_or(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_split(input: &[u8], at: usize) -> String {
        let mut decoder = ByteDecoder::new();
        let mut out = decoder.feed(&input[..at]).unwrap();
        out.push_str(&decoder.feed(&input[at..]).unwrap());
        out.push_str(&decoder.flush().unwrap());
        out
    }

    #[test]
    fn ascii_passes_through() {
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.feed(b"data: hi\n").unwrap(), "data: hi\n");
        assert_eq!(decoder.flush().unwrap(), "");
    }

    #[test]
    fn every_split_point_of_a_cjk_char() {
        let input = "中".as_bytes();
        for at in 0..=input.len() {
            assert_eq!(feed_split(input, at), "中", "split at {at}");
        }
    }

    #[test]
    fn every_split_point_of_mixed_text() {
        let text = "Hé中🎉!";
        let input = text.as_bytes();
        for at in 0..=input.len() {
            assert_eq!(feed_split(input, at), text, "split at {at}");
        }
    }

    #[test]
    fn one_byte_at_a_time() {
        let text = "数据🎉ok";
        let mut decoder = ByteDecoder::new();
        let mut out = String::new();
        for byte in text.as_bytes() {
            let piece = decoder.feed(std::slice::from_ref(byte)).unwrap();
            assert!(!piece.contains('\u{fffd}'));
            out.push_str(&piece);
        }
        out.push_str(&decoder.flush().unwrap());
        assert_eq!(out, text);
    }

    #[test]
    fn partial_sequence_is_held_back() {
        let bytes = "中".as_bytes();
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.feed(&bytes[..2]).unwrap(), "");
        assert_eq!(decoder.pending_len(), 2);
        assert_eq!(decoder.feed(&bytes[2..]).unwrap(), "中");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn truncated_stream_fails_on_flush() {
        let bytes = "🎉".as_bytes();
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.feed(&bytes[..3]).unwrap(), "");
        assert_eq!(
            decoder.flush().unwrap_err(),
            DecodeError::Truncated { pending: 3 }
        );
    }

    #[test]
    fn invalid_byte_reports_stream_offset() {
        let mut decoder = ByteDecoder::new();
        decoder.feed(b"abcd").unwrap();
        let err = decoder.feed(&[b'e', 0xff, b'f']).unwrap_err();
        assert_eq!(err, DecodeError::InvalidSequence { offset: 5 });
    }

    #[test]
    fn leading_bom_is_stripped_once() {
        let mut input = "\u{feff}".as_bytes().to_vec();
        input.extend_from_slice("x\u{feff}".as_bytes());
        let mut decoder = ByteDecoder::new();
        // BOM split across chunks.
        assert_eq!(decoder.feed(&input[..1]).unwrap(), "");
        assert_eq!(decoder.feed(&input[1..]).unwrap(), "x\u{feff}");
    }
}
