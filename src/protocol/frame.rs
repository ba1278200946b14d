// src/protocol/frame.rs
// Frames are a 4-byte little-endian length followed by the payload.
use byteorder::{ByteOrder, LittleEndian};
use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use log::{debug, error};

use crate::error::{Error, Result};

pub const MAX_FRAME_LENGTH: usize = 65535;
const HEADER_LENGTH: usize = 4;

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pops the next complete frame, or `Ok(None)` if more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if self.buffer.len() < HEADER_LENGTH {
            return Ok(None);
        }

        let length = LittleEndian::read_u32(&self.buffer[..HEADER_LENGTH]) as usize;

        if length > MAX_FRAME_LENGTH {
            error!("Refusing frame of {} bytes (max {})", length, MAX_FRAME_LENGTH);
            return Err(Error::FrameTooLarge(length));
        }

        if self.buffer.len() < HEADER_LENGTH + length {
            return Ok(None);
        }

        self.buffer.advance(HEADER_LENGTH);
        Ok(Some(self.buffer.split_to(length).freeze()))
    }

    /// Bytes buffered but not yet returned as a frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Pulls frames out of a byte-chunk stream. One reader per stream; once the
/// stream is exhausted the reader keeps returning `Ok(None)`.
pub struct FrameReader<S> {
    stream: S,
    decoder: FrameDecoder,
    done: bool,
}

impl<S, E> FrameReader<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
            done: false,
        }
    }

    /// Cancel-safe: buffered state only changes after a chunk has been
    /// received, so dropping the future mid-await loses nothing.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(frame) = self.decoder.next_frame()? {
                return Ok(Some(frame));
            }

            if self.done {
                return Ok(None);
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.decoder.push(&chunk),
                Some(Err(e)) => return Err(Error::Stream(e.into())),
                None => {
                    self.done = true;

                    let pending = self.decoder.pending();
                    if pending > 0 {
                        return Err(Error::TruncatedFrame(pending));
                    }

                    debug!("Frame stream ended");
                    return Ok(None);
                }
            }
        }
    }
}

/// Prefixes `payload` with its little-endian length.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LENGTH];
    LittleEndian::write_u32(&mut out, payload.len() as u32);
    out.extend_from_slice(payload);
    out
}
