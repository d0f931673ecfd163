//! Protocol codec
//!
//! Framing plus JSON encoding/decoding for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Frame
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │     Payload (JSON, UTF-8)   │
//! └──────────┴─────────────────────────────┘
//! ```
//! `Len` is big-endian and counts payload bytes only.
//!
//! ### Payload
//! - Request:  `{"command": "...", "keys": [...], "values"?: [...], "mode"?: "read"|"write"}`
//! - Response: `{"success": bool, "values"?: {...}, "skipped"?: [...], "error"?: "..."}`

use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{KvError, Result};
use super::{Command, Request, Response};

/// Header size: 4 bytes length
pub const HEADER_SIZE: usize = 4;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Initial buffer size when reading a payload
const READ_CHUNK_SIZE: usize = 64 * 1024;

// =============================================================================
// Frame Encoding/Decoding
// =============================================================================

/// Wrap a payload in a frame
///
/// Format: payload_len (4) + payload
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(KvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);

    Ok(frame.freeze())
}

/// Parse and validate a frame header, returning the payload length
fn payload_len(header: [u8; HEADER_SIZE]) -> Result<usize> {
    let len = u32::from_be_bytes(header);

    if len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }

    Ok(len as usize)
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command as a JSON payload
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    serde_json::to_vec(&Request::from(command))
        .map_err(|e| KvError::Serialization(e.to_string()))
}

/// Decode a JSON payload into a command
///
/// Malformed JSON is a `Decode` error; a well-formed request naming an
/// unknown command is `UnknownCommand`.
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let request: Request =
        serde_json::from_slice(bytes).map_err(|e| KvError::Decode(e.to_string()))?;

    Command::try_from(request)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response as a JSON payload
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    serde_json::to_vec(response).map_err(|e| KvError::Serialization(e.to_string()))
}

/// Decode a JSON payload into a response
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    serde_json::from_slice(bytes).map_err(|e| KvError::Decode(e.to_string()))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one frame's payload from a stream
///
/// Blocks until a complete frame is received or an error occurs
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Bytes> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let len = payload_len(header)?;

    // Grow with the bytes that actually arrive instead of trusting the header
    let mut payload = BytesMut::with_capacity(len.min(READ_CHUNK_SIZE)).writer();
    let copied = io::copy(&mut reader.by_ref().take(len as u64), &mut payload)?;
    if copied < len as u64 {
        return Err(KvError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("frame truncated: expected {} bytes, got {}", len, copied),
        )));
    }

    Ok(payload.into_inner().freeze())
}

/// Write one framed payload to a stream
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    write_frame(writer, &encode_command(command)?)
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let payload = read_frame(reader)?;
    decode_response(&payload)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    write_frame(writer, &encode_response(response)?)
}
