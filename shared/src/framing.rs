//! Reassembly of frames from a byte stream.

use crate::protocol::{classify, CodecError, FrameStatus, Message};
use crate::{BEGIN, MAX_FRAME};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Errors reading frames from a stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Bytes that could not start a frame, or a frame that never ended within
    /// [`MAX_FRAME`] bytes. The bytes were dropped; the stream is still usable.
    #[error("discarded {discarded} bytes of bogus frame data")]
    Bogus { discarded: usize },
    /// A complete frame that failed to decode. The frame was consumed.
    #[error("undecodable frame: {0}")]
    Codec(#[from] CodecError),
    #[error("peer closed the connection mid-frame")]
    PeerClosed,
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// Whether the stream can no longer be read after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::PeerClosed | FrameError::Io(_))
    }
}

/// Reads frames one at a time from `R`, keeping any bytes received past the
/// end of a frame for the next call.
pub struct FrameReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(MAX_FRAME),
        }
    }

    /// Returns the next message, or `None` once the peer closed the stream at
    /// a frame boundary.
    pub async fn read_message(&mut self) -> Result<Option<Message>, FrameError> {
        let mut chunk = [0u8; MAX_FRAME];

        loop {
            let padding = self.buffer.iter().take_while(|&&b| b == 0).count();
            self.buffer.drain(..padding);

            if !self.buffer.is_empty() {
                match classify(&self.buffer) {
                    FrameStatus::Complete(len) => {
                        let frame: Vec<u8> = self.buffer.drain(..len).collect();
                        return Ok(Some(Message::decode(&frame)?));
                    }
                    FrameStatus::Bogus => return Err(self.resync()),
                    FrameStatus::Incomplete if self.buffer.len() >= MAX_FRAME => {
                        return Err(self.resync());
                    }
                    FrameStatus::Incomplete => {}
                }
            }

            let room = MAX_FRAME - self.buffer.len();
            let n = self.reader.read(&mut chunk[..room]).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                self.buffer.clear();
                return Err(FrameError::PeerClosed);
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Drops bytes up to the next place a frame could begin.
    fn resync(&mut self) -> FrameError {
        let discarded = (1..self.buffer.len())
            .find(|&start| {
                let rest = &self.buffer[start..];
                let prefix = rest.len().min(BEGIN.len());
                rest[..prefix] == BEGIN[..prefix]
            })
            .unwrap_or(self.buffer.len());
        self.buffer.drain(..discarded);
        FrameError::Bogus { discarded }
    }
}

/// Writes one message as a zero-padded frame.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Message,
) -> Result<(), FrameError> {
    let frame = message.encode_padded()?;
    writer.write_all(&frame).await?;
    Ok(())
}
