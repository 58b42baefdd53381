use bytes::{Buf, BytesMut};

/// Incremental UTF-8 decoder for a chunked byte stream.
///
/// Bytes of a code point that is cut off at the end of a chunk are held back
/// and completed by the next call, so a read boundary never corrupts a
/// character. Invalid sequences decode to U+FFFD and decoding carries on.
/// One instance belongs to one response body.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: BytesMut,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(8),
        }
    }

    /// Decode as much of `pending + chunk` as forms complete characters.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());

        loop {
            let err = match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(err) => err,
            };

            let valid = err.valid_up_to();
            out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));

            match err.error_len() {
                Some(invalid) => {
                    out.push(char::REPLACEMENT_CHARACTER);
                    self.pending.advance(valid + invalid);
                }
                None => {
                    // Truncated sequence at the end; wait for the rest
                    self.pending.advance(valid);
                    return out;
                }
            }
        }
    }

    /// Number of bytes held back waiting for the rest of a code point.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ascii() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"hello"), "hello");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        // "你" is E4 BD A0
        let bytes = "你好".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();

        assert_eq!(decoder.decode(&bytes[..1]), "");
        assert_eq!(decoder.pending_len(), 1);
        assert_eq!(decoder.decode(&bytes[1..4]), "你");
        assert_eq!(decoder.decode(&bytes[4..]), "好");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_every_split_point_of_emoji() {
        let text = "a😀b";
        let bytes = text.as_bytes();

        for split in 0..=bytes.len() {
            let mut decoder = Utf8StreamDecoder::new();
            let mut out = decoder.decode(&bytes[..split]);
            out.push_str(&decoder.decode(&bytes[split..]));
            assert_eq!(out, text, "split at {}", split);
        }
    }

    #[test]
    fn test_one_byte_at_a_time() {
        let text = "données – 数据 – δεδομένα";
        let mut decoder = Utf8StreamDecoder::new();
        let out: String = text
            .as_bytes()
            .iter()
            .map(|b| decoder.decode(std::slice::from_ref(b)))
            .collect();
        assert_eq!(out, text);
    }

    #[test]
    fn test_invalid_byte_replaced() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
        assert_eq!(decoder.pending_len(), 0);
    }
}
