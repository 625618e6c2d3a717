//! Wire framing for the subscriber connection
//!
//! # TCP Protocol Specification
//!
//! The relay uses a length-prefixed framing protocol for all outbound
//! traffic:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ Verbatim batch bytes     │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! - **Length field**: 4-byte big-endian unsigned integer
//! - **Payload**: one flush batch, byte-for-byte as read from the device
//! - **Maximum frame size**: 1MB (1,048,576 bytes)
//!
//! The payload is opaque to the relay: no parsing, no reframing, no
//! message-boundary reconstruction. Sensor readings that span a flush
//! boundary arrive split across two frames; reassembly is the consumer's
//! responsibility.
//!
//! Inbound bytes from subscribers are read and discarded; the protocol is
//! output-only.

use crate::error::{Error, Result};
use std::io::Read;

/// Maximum payload size accepted in one frame (1MB)
pub const MAX_FRAME_SIZE: usize = 1_048_576;

/// Encode one batch as a length-prefixed frame into `out`
///
/// `out` is cleared first so it can be reused across batches.
pub fn encode_frame(payload: &[u8], out: &mut Vec<u8>) -> Result<()> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(Error::BatchTooLarge(payload.len()));
    }

    out.clear();
    out.reserve(4 + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

/// Read one length-prefixed frame from a stream
///
/// Returns `Ok(None)` on clean end-of-stream at a frame boundary. Used by
/// test clients; the relay itself never reads frames.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(Error::BatchTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}
