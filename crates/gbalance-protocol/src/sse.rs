use bytes::{Bytes, BytesMut};

/// Incremental decoder for newline-delimited `data: <payload>` records.
///
/// Bytes are buffered until a full line is available, so a record split
/// across reads (including inside a multi-byte UTF-8 sequence) is only
/// inspected once complete. Lines without a `data:` prefix are skipped.
#[derive(Debug, Default)]
pub struct DataLineDecoder {
    buffer: BytesMut,
}

impl DataLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one transport read and returns the payloads of every complete
    /// `data:` line it closed.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            if let Some(payload) = data_payload(&line[..pos]) {
                payloads.push(payload);
            }
        }

        payloads
    }

    /// Flushes a trailing line the upstream left unterminated.
    pub fn finish(&mut self) -> Vec<String> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let line = self.buffer.split();
        data_payload(&line).into_iter().collect()
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let value = line.strip_prefix(b"data:")?;
    let text = std::str::from_utf8(value).ok()?;
    Some(text.trim_start().to_string())
}

/// OpenAI-style record: `data: <payload>\n\n`.
pub fn frame_data(payload: &str) -> Bytes {
    Bytes::from(format!("data: {payload}\n\n"))
}

/// Gemini-style record: `data: <payload>\r\n\r\n`.
pub fn frame_data_crlf(payload: &str) -> Bytes {
    Bytes::from(format!("data: {payload}\r\n\r\n"))
}

pub const DONE_SENTINEL: &str = "[DONE]";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_record_split_across_reads() {
        let mut decoder = DataLineDecoder::new();
        assert!(
            decoder
                .push_bytes(br#"data: {"candidates":[{"content":{"parts":[{"te"#)
                .is_empty()
        );
        let payloads = decoder.push_bytes(b"xt\":\"hi\"}]}}]}\n\n");
        assert_eq!(
            payloads,
            vec![r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]}}]}"#.to_string()]
        );
    }

    #[test]
    fn many_lines_in_one_read() {
        let mut decoder = DataLineDecoder::new();
        let payloads = decoder.push_bytes(b"data: 1\r\n\r\n: keepalive\ndata: 2\n\ndata: 3");
        assert_eq!(payloads, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(decoder.finish(), vec!["3".to_string()]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn split_inside_multibyte_character() {
        let mut decoder = DataLineDecoder::new();
        let record = "data: \"héllo\"\n".as_bytes();
        // 'é' is two bytes; split between them.
        let split = record.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(decoder.push_bytes(&record[..split]).is_empty());
        assert_eq!(
            decoder.push_bytes(&record[split..]),
            vec!["\"héllo\"".to_string()]
        );
    }

    #[test]
    fn frames() {
        assert_eq!(frame_data("[DONE]"), Bytes::from_static(b"data: [DONE]\n\n"));
        assert_eq!(frame_data_crlf("{}"), Bytes::from_static(b"data: {}\r\n\r\n"));
    }
}
