//! Per-frame append buffer: coalesces one frame's worth of terminal output into a single `write`.

use std::io::{self, Write};

/// A growable byte sink. Nothing is written to the terminal until `flush_to` is called, so a
/// whole frame of screen updates is never observable to the user as a partial write.
#[derive(Default)]
pub struct AppendBuffer {
    buf: Vec<u8>,
}

impl AppendBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(4096) }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    pub fn push_byte(&mut self, b: u8) {
        self.buf.push(b);
    }

    /// Writes the accumulated bytes to `out` in one call and clears the buffer. A write failure is
    /// best-effort: the buffer is still cleared so the next frame starts clean.
    pub fn flush_to(&mut self, out: &mut impl Write) -> io::Result<()> {
        let result = out.write_all(&self.buf);
        self.buf.clear();
        result
    }
}
