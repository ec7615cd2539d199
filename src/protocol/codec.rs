//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Type (4) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - LaunchCommandWithOutput:        return_error (4) + return_output (4)
//!                                   + 3-entry string array (offsets from payload start)
//! - PutFileOnDevice:                packed path + chunk_type (4) + packed data
//! - GetFileFromDevice:              packed path
//! - GetFileInformationFromDevice:   packed path
//! - GetSystemInformationFromDevice: empty
//!
//! ### Response Record Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Type (4) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! A record with `Len == 0` ends the stream.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use super::command::{
    Command, CommandType, LaunchCommand, WriteRecordType, IMPERSONATE_LOGGED_ON_USER_PREFIX,
};
use super::wire::{
    pack_string, pack_string_array_at, packed_len, unpack_string, unpack_string_array_at,
    U32_SIZE,
};
use crate::error::{Result, SirepError};

/// Header size: 4 bytes type + 4 bytes length
pub const HEADER_SIZE: usize = 8;

/// Launch flags preceding the string table
const LAUNCH_FLAGS_SIZE: usize = 8;

/// Number of strings in a launch request
const LAUNCH_STRING_COUNT: usize = 3;

// =============================================================================
// Records
// =============================================================================

/// One raw unit of the response stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Position in the stream, starting at zero
    pub index: usize,

    /// Result type code
    pub result_type: u32,

    /// Raw payload
    pub payload: Vec<u8>,
}

/// Encode a record: type (4) + payload_len (4) + payload
pub fn encode_record(result_type: u32, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u32_le(result_type);
    message.put_u32_le(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

/// Encode the zero-length record that ends a stream
pub fn encode_end_marker(result_type: u32) -> Vec<u8> {
    encode_record(result_type, &[])
}

/// Write a record to a stream
pub fn write_record<W: Write>(writer: &mut W, result_type: u32, payload: &[u8]) -> Result<()> {
    writer.write_all(&encode_record(result_type, payload))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: type (4) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let payload = encode_payload(command);

    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u32_le(command.command_type().code());
    message.put_u32_le(payload.len() as u32);
    message.put_slice(&payload);
    message.to_vec()
}

fn encode_payload(command: &Command) -> BytesMut {
    let mut payload = BytesMut::new();
    match command {
        Command::LaunchCommandWithOutput(launch) => {
            // Stderr capture is always requested
            payload.put_u32_le(1);
            payload.put_u32_le(launch.return_output as u32);
            let command_line = launch.wire_command_line();
            let strings = [
                command_line.as_str(),
                launch.parameters.as_str(),
                launch.base_directory.as_str(),
            ];
            payload.put_slice(&pack_string_array_at(LAUNCH_FLAGS_SIZE, &strings));
        }
        Command::PutFileOnDevice { remote_path, data } => {
            payload.put_slice(&pack_string(remote_path));
            payload.put_u32_le(WriteRecordType::RegularChunk as u32);
            payload.put_slice(&pack_string(data));
        }
        Command::GetFileFromDevice { remote_path }
        | Command::GetFileInformationFromDevice { remote_path } => {
            payload.put_slice(&pack_string(remote_path));
        }
        Command::GetSystemInformationFromDevice => {}
    }
    payload
}

// =============================================================================
// Command Decoding
// =============================================================================

/// Decode a command from bytes
///
/// A launch command line that starts with the impersonation marker always
/// decodes with `as_logged_on_user` set. A `LaunchCommand` built by hand
/// with the marker in `command_line` and the flag off has the same wire
/// bytes, so it does not round-trip; [`LaunchCommand::new`] never builds one.
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    if bytes.len() < HEADER_SIZE {
        return Err(SirepError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let code = header.get_u32_le();
    let payload_len = header.get_u32_le() as usize;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(SirepError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    let payload = &bytes[HEADER_SIZE..total_len];
    let command_type = CommandType::from_code(code).ok_or_else(|| {
        SirepError::Protocol(format!("Unknown command type: 0x{:02x}", code))
    })?;

    match command_type {
        CommandType::LaunchCommandWithOutput => decode_launch_command(payload),
        CommandType::PutFileOnDevice => decode_put_file_command(payload),
        CommandType::GetFileFromDevice => Ok(Command::GetFileFromDevice {
            remote_path: decode_path(command_type, payload)?,
        }),
        CommandType::GetFileInformationFromDevice => Ok(Command::GetFileInformationFromDevice {
            remote_path: decode_path(command_type, payload)?,
        }),
        CommandType::GetSystemInformationFromDevice => {
            if !payload.is_empty() {
                return Err(SirepError::Protocol(format!(
                    "{}: unexpected payload of {} bytes",
                    command_type,
                    payload.len()
                )));
            }
            Ok(Command::GetSystemInformationFromDevice)
        }
    }
}

/// Decode a payload holding a single packed path
fn decode_path(command_type: CommandType, payload: &[u8]) -> Result<String> {
    unpack_string(payload).ok_or_else(|| {
        SirepError::Protocol(format!("{}: incomplete remote path", command_type))
    })
}

fn decode_put_file_command(payload: &[u8]) -> Result<Command> {
    let incomplete =
        |what: &str| SirepError::Protocol(format!("PutFileOnDevice: incomplete {}", what));

    let remote_path = unpack_string(payload).ok_or_else(|| incomplete("remote path"))?;
    let mut rest = &payload[packed_len(payload).ok_or_else(|| incomplete("remote path"))?..];

    if rest.remaining() < U32_SIZE {
        return Err(incomplete("chunk type"));
    }
    let chunk_type = rest.get_u32_le();
    if chunk_type != WriteRecordType::RegularChunk as u32 {
        return Err(SirepError::Protocol(format!(
            "PutFileOnDevice: unsupported chunk type 0x{:x}",
            chunk_type
        )));
    }

    let data = unpack_string(rest).ok_or_else(|| incomplete("data"))?;
    Ok(Command::PutFileOnDevice { remote_path, data })
}

fn decode_launch_command(payload: &[u8]) -> Result<Command> {
    if payload.len() < LAUNCH_FLAGS_SIZE {
        return Err(SirepError::Protocol(
            "LaunchCommandWithOutput: missing flags".to_string(),
        ));
    }
    let mut flags = &payload[..LAUNCH_FLAGS_SIZE];
    let _return_error = flags.get_u32_le();
    let return_output = flags.get_u32_le() != 0;

    let strings = unpack_string_array_at(payload, LAUNCH_FLAGS_SIZE);
    let [command_line, parameters, base_directory]: [String; LAUNCH_STRING_COUNT] =
        strings.try_into().map_err(|strings: Vec<String>| {
            SirepError::Protocol(format!(
                "LaunchCommandWithOutput: expected {} strings, got {}",
                LAUNCH_STRING_COUNT,
                strings.len()
            ))
        })?;

    let (command_line, as_logged_on_user) =
        match command_line.strip_prefix(IMPERSONATE_LOGGED_ON_USER_PREFIX) {
            Some(stripped) => (stripped.to_string(), true),
            None => (command_line, false),
        };

    Ok(Command::LaunchCommandWithOutput(LaunchCommand {
        return_output,
        command_line,
        as_logged_on_user,
        parameters,
        base_directory,
    }))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;

    decode_command(&message)
}
