use tracing::warn;

use crate::events::{StepEvent, WireStep};

/// Incremental parser for SSE text streams carrying `{title, output}` frames.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: String,
    pending_bytes: Vec<u8>,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StepEvent> {
        self.push_utf8(bytes);
        let mut events = Vec::new();

        while let Some((split, separator_len)) = find_frame_end(&self.buffer) {
            let frame = self.buffer[..split].to_string();
            self.buffer.drain(0..split + separator_len);

            let Some(payload) = extract_data_payload(&frame) else {
                continue;
            };
            if payload == "[DONE]" {
                continue;
            }

            match serde_json::from_str::<WireStep>(&payload) {
                Ok(wire) => events.push(StepEvent::from(wire)),
                Err(error) => warn!(%error, frame = %payload, "dropping malformed step frame"),
            }
        }

        events
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<StepEvent> {
        let mut parser = Self::default();
        parser.feed(input.as_bytes())
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty() && self.pending_bytes.is_empty()
    }

    // Chunk boundaries may split a multi-byte character; keep the tail until
    // the rest of it arrives.
    fn push_utf8(&mut self, bytes: &[u8]) {
        self.pending_bytes.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending_bytes) {
            Ok(text) => {
                self.buffer.push_str(text);
                self.pending_bytes.clear();
            }
            Err(error) => {
                let valid = error.valid_up_to();
                if error.error_len().is_some() {
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending_bytes));
                    self.pending_bytes.clear();
                    return;
                }
                self.buffer
                    .push_str(&String::from_utf8_lossy(&self.pending_bytes[..valid]));
                self.pending_bytes.drain(..valid);
            }
        }
    }
}

fn find_frame_end(buffer: &str) -> Option<(usize, usize)> {
    let lf = buffer.find("\n\n").map(|index| (index, 2));
    let crlf = buffer.find("\r\n\r\n").map(|index| (index, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();

    let payload = data_lines.join("\n");
    if payload.trim().is_empty() {
        None
    } else {
        Some(payload)
    }
}
