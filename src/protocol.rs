//! Length-prefixed JSON framing for the browser native-messaging channel.
//!
//! A frame is a `u32` payload length in the host's native byte order followed
//! by that many bytes of UTF-8 JSON.

use std::io::ErrorKind;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::FrameError;
use crate::types::Job;

/// Largest frame accepted from the browser.
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;
/// Largest frame the browser accepts from a native host.
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Scan `job.url`; `status` is set when the same message also asked for queue depth.
    Scan { job: Job, status: bool },
    /// Report the current queue depth.
    Status,
    /// Valid JSON that carries neither a `url` nor a `status` key.
    Unrecognized(Value),
}

impl Inbound {
    /// Classify a payload by its keys. A string `url` makes a job (`id` defaults
    /// to `null`); any `status` key requests a depth reply.
    pub fn from_value(value: Value) -> Self {
        let url = value.get("url").and_then(Value::as_str).map(str::to_owned);
        let status = value.get("status").is_some();
        match url {
            Some(url) => {
                let id = value.get("id").cloned().unwrap_or(Value::Null);
                Inbound::Scan {
                    job: Job { id, url },
                    status,
                }
            }
            None if status => Inbound::Status,
            None => Inbound::Unrecognized(value),
        }
    }
}

/// Read one frame. `Ok(None)` is a clean end of stream at a frame boundary.
///
/// A short length prefix, short body, oversized length or invalid JSON is an error;
/// callers treat every error as channel closure.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Value>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    let got = read_full(reader, &mut prefix).await?;
    if got == 0 {
        return Ok(None);
    }
    if got < prefix.len() {
        return Err(FrameError::Truncated {
            expected: prefix.len(),
            got,
        });
    }

    let len = u32::from_ne_bytes(prefix) as usize;
    if len > MAX_INBOUND_FRAME {
        return Err(FrameError::TooLarge {
            len,
            limit: MAX_INBOUND_FRAME,
        });
    }

    let mut body = vec![0u8; len];
    let got = read_full(reader, &mut body).await?;
    if got < len {
        return Err(FrameError::Truncated { expected: len, got });
    }
    Ok(Some(serde_json::from_slice(&body)?))
}

/// Read until `buf` is full or the stream ends; returns the number of bytes read.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Serialize `message` into a complete frame (prefix and body).
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, FrameError> {
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_OUTBOUND_FRAME {
        return Err(FrameError::TooLarge {
            len: body.len(),
            limit: MAX_OUTBOUND_FRAME,
        });
    }
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_ne_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Shared outbound half of the channel.
///
/// Status replies (from the read loop) and results (from the sink) go through
/// clones of the same writer; each frame is written and flushed under one lock,
/// so the reader never sees interleaved or partial frames.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for FrameWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    pub async fn send<T: Serialize>(&self, message: &T) -> Result<(), FrameError> {
        let frame = encode_frame(message)?;
        let mut writer = self.inner.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<(), FrameError> {
        self.inner.lock().await.shutdown().await?;
        Ok(())
    }
}
