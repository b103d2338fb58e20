//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - GET:      key_len (4) + key
//! - SET:      key_len (4) + key + ttl_ms (8) + value
//! - DELETE:   key_len (4) + key
//! - PING:     empty
//! - EXPIREAT: key_len (4) + key + at_ms (8)
//!
//! All integers are big-endian.
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use super::{Command, CommandType, Response, Status};
use crate::error::{CacheError, Result};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let cmd_type = command.command_type() as u8;

    let payload = match command {
        Command::Get { key } | Command::Delete { key } => {
            let mut payload = Vec::with_capacity(4 + key.len());
            put_key(&mut payload, key);
            payload
        }
        Command::Set { key, value, ttl_ms } => {
            let mut payload = Vec::with_capacity(4 + key.len() + 8 + value.len());
            put_key(&mut payload, key);
            payload.extend_from_slice(&ttl_ms.to_be_bytes());
            payload.extend_from_slice(value);
            payload
        }
        Command::ExpireAt { key, at_ms } => {
            let mut payload = Vec::with_capacity(4 + key.len() + 8);
            put_key(&mut payload, key);
            payload.extend_from_slice(&at_ms.to_be_bytes());
            payload
        }
        Command::Ping => Vec::new(),
    };

    frame(cmd_type, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "")?;

    match cmd_type {
        t if t == CommandType::Get as u8 => {
            let (key, rest) = take_key(payload, "GET")?;
            expect_empty(rest, "GET")?;
            Ok(Command::Get { key })
        }
        t if t == CommandType::Set as u8 => {
            let (key, rest) = take_key(payload, "SET")?;
            let (ttl_ms, value) = take_u64(rest, "SET", "ttl")?;
            Ok(Command::Set {
                key,
                value: value.to_vec(),
                ttl_ms,
            })
        }
        t if t == CommandType::Delete as u8 => {
            let (key, rest) = take_key(payload, "DELETE")?;
            expect_empty(rest, "DELETE")?;
            Ok(Command::Delete { key })
        }
        t if t == CommandType::Ping as u8 => {
            expect_empty(payload, "PING")?;
            Ok(Command::Ping)
        }
        t if t == CommandType::ExpireAt as u8 => {
            let (key, rest) = take_key(payload, "EXPIREAT")?;
            let (at_ms, rest) = take_u64(rest, "EXPIREAT", "timestamp")?;
            expect_empty(rest, "EXPIREAT")?;
            Ok(Command::ExpireAt { key, at_ms })
        }
        _ => Err(CacheError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

fn put_key(payload: &mut Vec<u8>, key: &[u8]) {
    payload.extend_from_slice(&(key.len() as u32).to_be_bytes());
    payload.extend_from_slice(key);
}

/// Split a length-prefixed key off the front of a payload
fn take_key<'a>(payload: &'a [u8], name: &str) -> Result<(Vec<u8>, &'a [u8])> {
    if payload.len() < 4 {
        return Err(CacheError::Protocol(format!(
            "{} command: missing key length",
            name
        )));
    }

    let key_len = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;

    if payload.len() - 4 < key_len {
        return Err(CacheError::Protocol(format!(
            "{} command: incomplete key (expected {}, got {})",
            name,
            key_len,
            payload.len() - 4
        )));
    }

    Ok((payload[4..4 + key_len].to_vec(), &payload[4 + key_len..]))
}

fn take_u64<'a>(payload: &'a [u8], name: &str, field: &str) -> Result<(u64, &'a [u8])> {
    if payload.len() < 8 {
        return Err(CacheError::Protocol(format!(
            "{} command: missing {}",
            name, field
        )));
    }

    let mut raw = [0u8; 8];
    raw.copy_from_slice(&payload[..8]);
    Ok((u64::from_be_bytes(raw), &payload[8..]))
}

fn expect_empty(rest: &[u8], name: &str) -> Result<()> {
    if !rest.is_empty() {
        return Err(CacheError::Protocol(format!(
            "{} command: unexpected trailing {} bytes",
            name,
            rest.len()
        )));
    }
    Ok(())
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response ")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        _ => {
            return Err(CacheError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Framing
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(tag);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

/// Validate a header and return (tag, payload)
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(CacheError::Protocol(format!(
            "Incomplete {}header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = payload_len(&bytes[..HEADER_SIZE])?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(CacheError::Protocol(format!(
            "Incomplete {}payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

fn payload_len(header: &[u8]) -> Result<usize> {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if len > MAX_PAYLOAD_SIZE {
        return Err(CacheError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

/// Read one full frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = payload_len(&header)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader)?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader)?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
