//! Byte buffering for shell output.
//!
//! The module emits two kinds of framing: streaming commands produce one
//! `\r\n` terminated line per record, while one-shot commands produce a block
//! of lines that ends with the `dwm> ` prompt (which has no line terminator).
//! [`ShellCodec`] accumulates received bytes and splits out either form.

use bytes::BytesMut;

/// Line terminator the shell expects after a command.
pub const LINE_TERMINATOR: u8 = b'\r';

/// Prompt printed by the shell when it is ready for the next command.
pub const SHELL_PROMPT: &[u8] = b"dwm> ";

/// Initial receive buffer capacity.
pub const RECEIVE_BUFFER_CAPACITY: usize = 512;

/// Accumulates module output and frames it into lines or prompt blocks.
#[derive(Debug, Default)]
pub struct ShellCodec {
    buffer: BytesMut,
}

impl ShellCodec {
    /// Create a new codec with an empty buffer.
    pub fn new() -> Self {
        ShellCodec {
            buffer: BytesMut::with_capacity(RECEIVE_BUFFER_CAPACITY),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete, non-empty line from the buffer.
    ///
    /// The terminator (`\r`, `\n` or any run of both) is consumed and not
    /// returned. Returns `None` if no complete line is buffered yet.
    pub fn decode_line(&mut self) -> Option<Vec<u8>> {
        loop {
            let end = self.buffer.iter().position(|&b| b == b'\r' || b == b'\n')?;

            let line = self.buffer.split_to(end);

            while !self.buffer.is_empty() && (self.buffer[0] == b'\r' || self.buffer[0] == b'\n') {
                let _ = self.buffer.split_to(1);
            }

            if !line.is_empty() {
                return Some(line.to_vec());
            }
        }
    }

    /// Try to decode everything up to and including `marker`.
    ///
    /// Returns `None` if the marker has not been received yet.
    pub fn decode_until(&mut self, marker: &[u8]) -> Option<Vec<u8>> {
        if marker.is_empty() {
            return Some(Vec::new());
        }

        let start = self
            .buffer
            .windows(marker.len())
            .position(|window| window == marker)?;

        Some(self.buffer.split_to(start + marker.len()).to_vec())
    }

    /// Encode a named command for transmission.
    ///
    /// Appends the carriage return terminator.
    pub fn encode_command(cmd: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(cmd.len() + 1);
        buf.extend_from_slice(cmd.as_bytes());
        buf.push(LINE_TERMINATOR);
        buf
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop everything buffered so far.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the current buffer contents as a string (for debugging).
    pub fn buffer_as_str(&self) -> String {
        String::from_utf8_lossy(&self.buffer).to_string()
    }
}
