// Incremental decoder for OpenAI-style Server-Sent Events.
//
// Chat completion streams look like:
//
//   data: {"choices":[{"delta":{"content":"Ol"}}]}
//   data: {"choices":[{"delta":{"content":"á"}}]}
//   data: [DONE]
//
// Network chunks can split a line (or a multi-byte character) anywhere, so
// bytes are buffered until a full line is available.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the events of every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&rest))
            .into_iter()
            .collect()
    }
}

/// Parses one SSE line. Comments, other fields, empty deltas and malformed
/// JSON yield `None`.
pub fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }

    let chunk: serde_json::Value = serde_json::from_str(data).ok()?;
    let content = chunk["choices"][0]["delta"]["content"].as_str()?;
    if content.is_empty() {
        None
    } else {
        Some(SseEvent::Delta(content.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    #[test]
    fn test_parse_line_variants() {
        assert_eq!(parse_line("data: [DONE]"), Some(SseEvent::Done));
        assert_eq!(parse_line(": keep-alive"), None);
        assert_eq!(parse_line("event: message"), None);
        assert_eq!(parse_line("data: {not json"), None);
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            None
        );
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#),
            None
        );
        assert_eq!(
            parse_line(r#"data:{"choices":[{"delta":{"content":"oi"}}]}"#),
            Some(SseEvent::Delta("oi".to_string()))
        );
    }

    #[test]
    fn test_lines_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let payload = format!("{}{}data: [DONE]\n", delta("Olá"), delta(" mundo"));
        let bytes = payload.as_bytes();

        // Split inside the multi-byte "á" and inside the second line.
        let split_a = payload.find('á').unwrap() + 1;
        let split_b = payload.find(" mundo").unwrap();

        let mut events = decoder.push(&bytes[..split_a]);
        assert!(events.is_empty());
        events.extend(decoder.push(&bytes[split_a..split_b]));
        events.extend(decoder.push(&bytes[split_b..]));

        assert_eq!(
            events,
            vec![
                SseEvent::Delta("Olá".to_string()),
                SseEvent::Delta(" mundo".to_string()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(delta("a").replace('\n', "\r\n").as_bytes());
        assert_eq!(events, vec![SseEvent::Delta("a".to_string())]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), vec![SseEvent::Done]);
        assert!(decoder.finish().is_empty());
    }
}
