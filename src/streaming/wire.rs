//! Wire format serialization and framing.
//!
//! All subscriber traffic uses length-prefixed framing:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ JSON object              │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! Payloads are the JSON message shapes in [`crate::streaming::messages`];
//! the `type`-tagged layout is part of the external contract, so the
//! payload encoding is fixed rather than negotiable. A frame longer than
//! [`MAX_FRAME_SIZE`] closes the connection; a payload that fails to
//! deserialize is logged and discarded while the connection stays open.

use crate::error::{Error, Result};
use crate::streaming::messages::OutboundMessage;
use std::io::{Read, Write};

/// Maximum accepted frame payload (1 MB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Serialize a message to payload bytes.
pub fn encode_message(msg: &OutboundMessage) -> Result<Vec<u8>> {
    serde_json::to_vec(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Deserialize payload bytes to a message.
pub fn decode_message(bytes: &[u8]) -> Result<OutboundMessage> {
    serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
}

/// Write one length-prefixed frame.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Read one length-prefixed frame.
///
/// Returns `Ok(None)` when the read timed out before a frame started, so
/// callers on a timeout socket can interleave liveness checks. EOF maps
/// to [`Error::Disconnected`]; an oversized length closes the connection
/// with an error.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(Error::Disconnected)
        }
        Err(e) => return Err(Error::Io(e)),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(Error::Serialization(format!(
            "frame too large: {} bytes",
            len
        )));
    }

    let mut payload = vec![0u8; len];
    match reader.read_exact(&mut payload) {
        Ok(()) => Ok(Some(payload)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::Disconnected),
        Err(e) => Err(Error::Io(e)),
    }
}
