//! Protocol Module
//!
//! Defines the Sirep wire protocol spoken with the device.
//!
//! ## Protocol Format
//!
//! ### Session
//! ```text
//! client                                   device
//!   │ ──────────── TCP connect ──────────────▶ │
//!   │ ◀──────── banner (16 bytes) ──────────── │
//!   │ ──────────── command ──────────────────▶ │
//!   │ ◀──────────── record 0 ───────────────── │
//!   │ ◀──────────── record N ───────────────── │
//!   │ ◀──── zero-length record / close / idle ─│
//! ```
//!
//! ### Commands
//! - 0x0A: LaunchCommandWithOutput
//! - 0x14: PutFileOnDevice
//! - 0x1E: GetFileFromDevice
//! - 0x28: GetFileInformationFromDevice
//! - 0x32: GetSystemInformationFromDevice
//!
//! ### Result Records
//! - 0x01: HResult
//! - 0x0B: OutputStream
//! - 0x0C: ErrorStream
//! - 0x1F: File
//! - 0x29: FileInformation
//! - 0x33: SystemInformation

pub mod wire;
mod command;
mod result;
mod codec;
mod dispatch;

pub use command::{
    Command, CommandType, LaunchCommand, WriteRecordType, IMPERSONATE_LOGGED_ON_USER_PREFIX,
};
pub use result::{
    hresult_hex, FieldValue, FileDetails, FileInformation, ResultBody, ResultType, SirepResult,
    SystemInformation, FILE_INFORMATION_SIZE, HRESULT_SIZE, OS_VERSION_INFO_EX_SIZE,
};
pub use codec::{
    decode_command, encode_command, encode_end_marker, encode_record, read_command,
    write_command, write_record, Record, HEADER_SIZE,
};
pub use dispatch::{decode_record, decoder_for, Decoder, RESULT_DECODERS};
