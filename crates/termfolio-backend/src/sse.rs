//! Incremental decoder for Gemini server-sent events.

use serde_json::Value;

/// Splits a byte stream into `data:` events and extracts reply text.
///
/// Chunks may end mid-line; the partial line is kept until the next push.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the text fragments it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut fragments = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            fragments.extend(decode_line(line.trim()));
        }
        fragments
    }

    /// Flush a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Vec<String> {
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        decode_line(line.trim())
    }
}

fn decode_line(line: &str) -> Vec<String> {
    let Some(data) = line.strip_prefix("data:") else {
        return Vec::new();
    };
    let data = data.trim_start();
    match serde_json::from_str::<Value>(data) {
        Ok(json) => extract_text(&json),
        Err(e) => {
            let preview: String = data.chars().take(200).collect();
            tracing::warn!(error = %e, data_preview = %preview, "Failed to parse SSE chunk");
            Vec::new()
        }
    }
}

/// Text parts of the first candidate in a `streamGenerateContent` chunk.
#[must_use]
pub fn extract_text(chunk: &Value) -> Vec<String> {
    chunk["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
