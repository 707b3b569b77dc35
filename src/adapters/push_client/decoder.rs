//! Incremental `text/event-stream` decoder.
//!
//! Bytes arrive in arbitrary chunks; the decoder buffers partial lines and
//! yields complete frames:
//!
//! ```text
//! ":heartbeat\n\n"                 → Comment("heartbeat")
//! "data: {\"kind\":...}\n\n"       → Data("{\"kind\":...}")
//! "data: a\ndata: b\n\n"           → Data("a\nb")
//! ```
//!
//! `event:`, `id:` and `retry:` fields are accepted and ignored.

/// One decoded server-sent frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A `:` comment line. Heartbeats arrive as comments.
    Comment(String),
    /// The joined `data:` lines of one event.
    Data(String),
}

/// Stateful decoder for one connection.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.take_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn take_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let joined = self.data.join("\n");
            self.data.clear();
            return Some(SseFrame::Data(joined));
        }

        if let Some(comment) = line.strip_prefix(':') {
            return Some(SseFrame::Comment(comment.trim_start().to_string()));
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }
}
