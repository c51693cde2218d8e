//! Newline-delimited text protocol.

use std::str::Utf8Error;

/// Maximum bytes taken from the socket per read.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Marker telling the client the server is ready for the next command.
pub const PROMPT: &str = "\n\n> ";

/// Reply to a blank line.
pub const READY: &str = "> ";

/// Frame a synchronous reply.
#[must_use]
pub fn reply(text: &str) -> String {
    format!("{text}{PROMPT}")
}

/// Accumulates socket reads and yields complete lines.
///
/// A line longer than `max_line` bytes without a newline is yielded as-is
/// once the buffer fills, cut before any character split by the limit.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    max_line: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(READ_BUFFER_SIZE)
    }
}

impl LineBuffer {
    #[must_use]
    pub fn new(max_line: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_line),
            max_line: max_line.max(1),
        }
    }

    /// Append a chunk and decode every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, Utf8Error>> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        loop {
            if let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop();
                lines.push(decode(&line));
            } else if self.buf.len() >= self.max_line {
                let cut = char_boundary(&self.buf[..self.max_line]);
                let line: Vec<u8> = self.buf.drain(..cut).collect();
                lines.push(decode(&line));
            } else {
                break;
            }
        }
        lines
    }

    /// Bytes held waiting for a newline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Length of `bytes` minus a trailing incomplete UTF-8 sequence.
///
/// Invalid input is left whole so decoding reports it.
fn char_boundary(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Err(e) if e.error_len().is_none() && e.valid_up_to() > 0 => e.valid_up_to(),
        _ => bytes.len(),
    }
}

fn decode(line: &[u8]) -> Result<String, Utf8Error> {
    std::str::from_utf8(line).map(|s| s.trim_end_matches('\r').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_lines(buffer: &mut LineBuffer, chunk: &[u8]) -> Vec<String> {
        buffer.push(chunk).into_iter().map(Result::unwrap).collect()
    }

    #[test]
    fn test_splits_lines_and_strips_cr() {
        let mut buffer = LineBuffer::default();
        assert_eq!(ok_lines(&mut buffer, b"HELP\r\nINFO\n"), vec!["HELP", "INFO"]);
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn test_keeps_partial_line() {
        let mut buffer = LineBuffer::default();
        assert!(ok_lines(&mut buffer, b"PROJ").is_empty());
        assert_eq!(ok_lines(&mut buffer, b"ECTS 1\n"), vec!["PROJECTS 1"]);
    }

    #[test]
    fn test_overlong_line_is_flushed() {
        let mut buffer = LineBuffer::new(4);
        assert_eq!(ok_lines(&mut buffer, b"abcdef"), vec!["abcd"]);
        assert_eq!(buffer.pending(), 2);
    }

    #[test]
    fn test_overlong_line_never_splits_a_character() {
        let mut buffer = LineBuffer::default();

        let mut first = vec![b'a'; READ_BUFFER_SIZE - 1];
        first.push(0xC3);
        let lines = ok_lines(&mut buffer, &first);
        assert_eq!(lines, vec!["a".repeat(READ_BUFFER_SIZE - 1)]);
        assert_eq!(buffer.pending(), 1);

        let mut second = vec![0xA9, b'\n'];
        second.resize(READ_BUFFER_SIZE, b'b');
        let lines = ok_lines(&mut buffer, &second);
        assert_eq!(lines, vec!["\u{e9}"]);
        assert_eq!(buffer.pending(), READ_BUFFER_SIZE - 2);
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        let mut buffer = LineBuffer::default();
        let lines = buffer.push(b"\xff\xfe\n");
        assert!(lines[0].is_err());
    }

    #[test]
    fn test_reply_appends_prompt() {
        assert_eq!(reply("hi"), "hi\n\n> ");
    }
}
