//! Line-ending filter for base64 payloads.
//!
//! The transport wrapper's payload is standard base64 text and may be broken
//! across lines. The streaming decoder in the `base64` crate treats `\r` and
//! `\n` as invalid symbols, so the payload passes through this filter first,
//! matching the newline-tolerant behavior of the reference decoder.

use std::io::{self, Read};

/// A reader adapter that drops `\r` and `\n` bytes from the inner stream.
pub(crate) struct LineEndingFilter<R> {
    inner: R,
}

impl<R: Read> LineEndingFilter<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for LineEndingFilter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // A read may yield only line endings; keep going until at least one
        // payload byte is available or the inner stream is exhausted.
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                let byte = buf[i];
                if byte != b'\n' && byte != b'\r' {
                    buf[kept] = byte;
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}
