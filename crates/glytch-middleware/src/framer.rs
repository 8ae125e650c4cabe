//! [`LineFramer`] – newline framing over a device byte connection.
//!
//! Bytes are accumulated in a growable buffer until a `\n` terminator is
//! seen; the line before it is yielded (lossily decoded, whitespace-trimmed,
//! so `\r\n` endings are accepted) and any trailing partial bytes are kept for
//! the next pull.
//!
//! A read error, a read timeout, or end-of-stream ends the sequence with
//! [`GlytchError::ConnectionLost`].  The framer never reconnects; a new
//! connection needs a new framer.
//!
//! [`LineFramer::next_line`] is cancel-safe: dropping its future mid-read
//! loses no buffered bytes, so it can sit inside a `tokio::select!` next to a
//! shutdown signal.

use std::time::Duration;

use glytch_types::GlytchError;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Bytes requested from the connection per read.
const READ_CHUNK: usize = 512;

pub struct LineFramer<R> {
    reader: R,
    buf: Vec<u8>,
    /// Prefix of `buf` already searched for a terminator.
    scanned: usize,
    read_timeout: Option<Duration>,
    finished: bool,
}

impl<R: AsyncRead + Unpin> LineFramer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(READ_CHUNK),
            scanned: 0,
            read_timeout: None,
            finished: false,
        }
    }

    /// Bound every individual read.  Expiry is reported as
    /// [`GlytchError::ConnectionLost`].  `None` waits forever.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Pull the next complete line, suspending until one is available.
    ///
    /// A final unterminated line is still yielded when the stream ends; the
    /// pull after it returns the terminal `ConnectionLost`.
    pub async fn next_line(&mut self) -> Result<String, GlytchError> {
        loop {
            if let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
                let end = self.scanned + offset;
                let raw: Vec<u8> = self.buf.drain(..=end).collect();
                self.scanned = 0;
                return Ok(decode(&raw));
            }
            self.scanned = self.buf.len();

            if self.finished {
                return Err(GlytchError::connection_lost("end of stream"));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.fill(&mut chunk).await?;
            if n == 0 {
                self.finished = true;
                if !self.buf.is_empty() {
                    let rest = std::mem::take(&mut self.buf);
                    self.scanned = 0;
                    return Ok(decode(&rest));
                }
                return Err(GlytchError::connection_lost("end of stream"));
            }
            trace!(bytes = n, buffered = self.buf.len(), "read from device");
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Number of bytes held back waiting for a terminator.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    async fn fill(&mut self, chunk: &mut [u8]) -> Result<usize, GlytchError> {
        let read = self.reader.read(chunk);
        let result = match self.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => {
                    self.finished = true;
                    return Err(GlytchError::connection_lost(format!(
                        "no data received for {}ms",
                        limit.as_millis()
                    )));
                }
            },
            None => read.await,
        };
        result.map_err(|e| {
            self.finished = true;
            GlytchError::connection_lost(format!("read failed: {e}"))
        })
    }
}

fn decode(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}
