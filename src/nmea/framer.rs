//! # Sentence Framer
//!
//! Extracts delimited telemetry sentences from an arbitrary byte stream.
//!
//! A sentence starts at `!` or `$` and ends at `\n` (excluded from the
//! output). Bytes before a start marker are discarded. A sentence that
//! exceeds the buffer bound without a terminator is silently abandoned and
//! framing resumes at the next start marker.

/// Sentence buffer size: start byte plus up to 100 accumulated bytes.
pub const SENTENCE_BUFFER_SIZE: usize = 101;

/// Maximum bytes accumulated after the start byte before the sentence is
/// abandoned.
const MAX_ACCUMULATED: usize = SENTENCE_BUFFER_SIZE - 1;

/// Byte-stream sentence framer.
///
/// Feed it bytes one at a time or in chunks; complete sentences come back
/// as strings without their trailing newline. Never fails: garbage input
/// only ever produces fewer sentences.
///
/// # Examples
///
/// ```
/// use anchor_watch::nmea::framer::SentenceFramer;
///
/// let mut framer = SentenceFramer::new();
/// let sentences = framer.push_bytes(b"noise$GPDPT,3.2,\nmore");
/// assert_eq!(sentences, vec!["$GPDPT,3.2,".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct SentenceFramer {
    buf: Vec<u8>,
    started: bool,
}

impl SentenceFramer {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(SENTENCE_BUFFER_SIZE),
            started: false,
        }
    }

    /// Consume one byte, returning a complete sentence if this byte ends one.
    pub fn push_byte(&mut self, byte: u8) -> Option<String> {
        if !self.started {
            if byte == b'!' || byte == b'$' {
                self.started = true;
                self.buf.clear();
                self.buf.push(byte);
            }
            return None;
        }

        if self.buf.len() < MAX_ACCUMULATED {
            self.buf.push(byte);
            if byte == b'\n' {
                self.started = false;
                // Exclude the terminator
                return Some(bytes_to_text(&self.buf[..self.buf.len() - 1]));
            }
            None
        } else {
            // Overflow: abandon the in-progress sentence, no emit
            self.started = false;
            None
        }
    }

    /// Consume a chunk of bytes, returning all sentences completed by it.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    /// Drop any in-progress sentence, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.started = false;
        self.buf.clear();
    }
}

/// Decode accumulated bytes as text.
///
/// Sentences are 7-bit ASCII; bytes outside that range are carried through
/// as their one-byte char value so that decoding can never fault.
fn bytes_to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_sentence() {
        let mut framer = SentenceFramer::new();
        let sentences = framer.push_bytes(b"$GPDPT,12.3,\n");
        assert_eq!(sentences, vec!["$GPDPT,12.3,".to_string()]);
    }

    #[test]
    fn test_bang_start_marker() {
        let mut framer = SentenceFramer::new();
        let sentences = framer.push_bytes(b"!AIVDM,1,1,,A,payload,0\n");
        assert_eq!(sentences, vec!["!AIVDM,1,1,,A,payload,0".to_string()]);
    }

    #[test]
    fn test_leading_garbage_discarded() {
        let mut framer = SentenceFramer::new();
        let sentences = framer.push_bytes(b"\xFF\x00garbage\r\n$GPHDT,181.1,T\n");
        assert_eq!(sentences, vec!["$GPHDT,181.1,T".to_string()]);
    }

    #[test]
    fn test_sentence_split_across_chunks() {
        let mut framer = SentenceFramer::new();
        assert!(framer.push_bytes(b"$GPM").is_empty());
        assert!(framer.push_bytes(b"WV,45.0,R,").is_empty());
        let sentences = framer.push_bytes(b"10.2,N,A\n");
        assert_eq!(sentences, vec!["$GPMWV,45.0,R,10.2,N,A".to_string()]);
    }

    #[test]
    fn test_multiple_sentences_in_one_chunk() {
        let mut framer = SentenceFramer::new();
        let sentences = framer.push_bytes(b"$GPDPT,1.0,\n$GPDPT,2.0,\n");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "$GPDPT,1.0,");
        assert_eq!(sentences[1], "$GPDPT,2.0,");
    }

    #[test]
    fn test_overlong_sentence_abandoned_silently() {
        let mut framer = SentenceFramer::new();
        let mut stream = Vec::new();
        stream.push(b'$');
        stream.extend(std::iter::repeat(b'X').take(150));
        stream.push(b'\n');
        // The abandoned sentence produces nothing, even at its newline
        assert!(framer.push_bytes(&stream).is_empty());

        // Framer recovers at the next start marker
        let sentences = framer.push_bytes(b"$GPDPT,5.5,\n");
        assert_eq!(sentences, vec!["$GPDPT,5.5,".to_string()]);
    }

    #[test]
    fn test_sentence_at_exact_bound_is_kept() {
        // Start byte plus 98 payload bytes plus newline still fits
        let mut framer = SentenceFramer::new();
        let mut stream = vec![b'$'];
        stream.extend(std::iter::repeat(b'A').take(98));
        stream.push(b'\n');
        let sentences = framer.push_bytes(&stream);
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].len(), 99);
    }

    #[test]
    fn test_sentence_one_past_bound_is_abandoned() {
        let mut framer = SentenceFramer::new();
        let mut stream = vec![b'$'];
        stream.extend(std::iter::repeat(b'A').take(99));
        stream.push(b'\n');
        assert!(framer.push_bytes(&stream).is_empty());
    }

    #[test]
    fn test_non_ascii_bytes_pass_through() {
        let mut framer = SentenceFramer::new();
        let sentences = framer.push_bytes(b"$AB\xC3CD\n");
        assert_eq!(sentences.len(), 1);
        // Byte 0xC3 carried through as its one-byte char value, no fault
        assert_eq!(sentences[0].chars().count(), 5);
        assert_eq!(sentences[0].chars().nth(2), Some('\u{C3}'));
    }

    #[test]
    fn test_reset_drops_partial_sentence() {
        let mut framer = SentenceFramer::new();
        assert!(framer.push_bytes(b"$GPDPT,1").is_empty());
        framer.reset();
        // The tail of the dropped sentence is now garbage before a start marker
        assert!(framer.push_bytes(b".0,\n").is_empty());
        let sentences = framer.push_bytes(b"$GPDPT,2.0,\n");
        assert_eq!(sentences, vec!["$GPDPT,2.0,".to_string()]);
    }

    #[test]
    fn test_stream_of_garbage_emits_nothing() {
        let mut framer = SentenceFramer::new();
        let garbage: Vec<u8> = (0u8..=255).filter(|&b| b != b'!' && b != b'$').collect();
        assert!(framer.push_bytes(&garbage).is_empty());
    }
}
