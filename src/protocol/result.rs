//! Result definitions
//!
//! Typed records the device sends back after a command.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Buf;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use super::wire::{filetime_to_datetime, low_high_to_u64};
use crate::error::{Result, SirepError};

/// Size of an OSVERSIONINFOEX record as sent by the device
pub const OS_VERSION_INFO_EX_SIZE: usize = 0x20;

/// Size of a file information record
pub const FILE_INFORMATION_SIZE: usize = 0x28;

/// Size of an HRESULT record
pub const HRESULT_SIZE: usize = 0x4;

/// Result record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum ResultType {
    HResult = 0x01,
    OutputStream = 0x0B,
    ErrorStream = 0x0C,
    File = 0x1F,
    FileInformation = 0x29,
    SystemInformation = 0x33,
}

impl ResultType {
    /// Every result type, in wire code order
    pub const ALL: [ResultType; 6] = [
        ResultType::HResult,
        ResultType::OutputStream,
        ResultType::ErrorStream,
        ResultType::File,
        ResultType::FileInformation,
        ResultType::SystemInformation,
    ];

    /// Look up a result type by wire code
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Wire code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Payload size for fixed-shape results
    ///
    /// Only this many bytes of a longer payload are interpreted.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            ResultType::HResult => Some(HRESULT_SIZE),
            ResultType::FileInformation => Some(FILE_INFORMATION_SIZE),
            ResultType::SystemInformation => Some(OS_VERSION_INFO_EX_SIZE),
            ResultType::OutputStream | ResultType::ErrorStream | ResultType::File => None,
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            ResultType::HResult => "HResultResult",
            ResultType::OutputStream => "OutputStreamResult",
            ResultType::ErrorStream => "ErrorStreamResult",
            ResultType::File => "FileResult",
            ResultType::FileInformation => "FileInformationResult",
            ResultType::SystemInformation => "SystemInformationResult",
        }
    }
}

// =============================================================================
// Field Values
// =============================================================================

/// A decoded field, for the generic name → value view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Unsigned(u64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{:?}", s),
            FieldValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            FieldValue::Timestamp(t) => {
                write!(f, "{}", t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"))
            }
        }
    }
}

/// Hex rendering of a status code (`0x0`, `0x80070002`)
pub fn hresult_hex(code: u32) -> String {
    format!("{:#x}", code)
}

// =============================================================================
// Typed Payloads
// =============================================================================

/// OSVERSIONINFOEX as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemInformation {
    pub os_version_info_size: u32,
    pub major_version: u32,
    pub minor_version: u32,
    pub build_number: u32,
    pub platform_id: u32,
    pub csd_version: u32,
    pub service_pack_major: u16,
    pub service_pack_minor: u16,
    pub suite_mask: u16,
    pub product_type: u8,
    pub reserved: u8,
}

impl SystemInformation {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut r = FieldReader::new(payload);
        Ok(Self {
            os_version_info_size: r.u32("os_version_info_size")?,
            major_version: r.u32("major_version")?,
            minor_version: r.u32("minor_version")?,
            build_number: r.u32("build_number")?,
            platform_id: r.u32("platform_id")?,
            csd_version: r.u32("csd_version")?,
            service_pack_major: r.u16("service_pack_major")?,
            service_pack_minor: r.u16("service_pack_minor")?,
            suite_mask: r.u16("suite_mask")?,
            product_type: r.u8("product_type")?,
            reserved: r.u8("reserved")?,
        })
    }

    fn fields(&self, kv: &mut BTreeMap<&'static str, FieldValue>) {
        let entries: [(&'static str, u64); 11] = [
            ("os_version_info_size", self.os_version_info_size.into()),
            ("major_version", self.major_version.into()),
            ("minor_version", self.minor_version.into()),
            ("build_number", self.build_number.into()),
            ("platform_id", self.platform_id.into()),
            ("csd_version", self.csd_version.into()),
            ("service_pack_major", self.service_pack_major.into()),
            ("service_pack_minor", self.service_pack_minor.into()),
            ("suite_mask", self.suite_mask.into()),
            ("product_type", self.product_type.into()),
            ("reserved", self.reserved.into()),
        ];
        for (name, value) in entries {
            kv.insert(name, FieldValue::Unsigned(value));
        }
    }
}

/// Size and timestamps of a file, only sent meaningfully on success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileDetails {
    pub file_size: u64,
    pub time_created: Option<DateTime<Utc>>,
    pub time_last_access: Option<DateTime<Utc>>,
    pub time_last_write: Option<DateTime<Utc>>,
}

/// File information record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileInformation {
    pub hresult: u32,
    pub file_attributes: u32,
    /// `None` unless `hresult` is zero
    pub details: Option<FileDetails>,
}

impl FileInformation {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut r = FieldReader::new(payload);
        let hresult = r.u32("hresult")?;
        let file_attributes = r.u32("file_attributes")?;
        let size_low = r.u32("file_size_low")?;
        let size_high = r.u32("file_size_high")?;
        let created = (r.u32("created_low")?, r.u32("created_high")?);
        let last_access = (r.u32("last_access_low")?, r.u32("last_access_high")?);
        let last_write = (r.u32("last_write_low")?, r.u32("last_write_high")?);

        let details = (hresult == 0).then(|| FileDetails {
            file_size: low_high_to_u64(size_low, size_high),
            time_created: filetime_to_datetime(created.0, created.1),
            time_last_access: filetime_to_datetime(last_access.0, last_access.1),
            time_last_write: filetime_to_datetime(last_write.0, last_write.1),
        });

        Ok(Self {
            hresult,
            file_attributes,
            details,
        })
    }

    fn fields(&self, kv: &mut BTreeMap<&'static str, FieldValue>) {
        kv.insert("hresult", FieldValue::Text(hresult_hex(self.hresult)));
        kv.insert("file_attributes", FieldValue::Unsigned(self.file_attributes.into()));
        if let Some(details) = &self.details {
            kv.insert("file_size", FieldValue::Unsigned(details.file_size));
            let times = [
                ("time_created", details.time_created),
                ("time_last_access", details.time_last_access),
                ("time_last_write", details.time_last_write),
            ];
            for (name, time) in times {
                if let Some(time) = time {
                    kv.insert(name, FieldValue::Timestamp(time));
                }
            }
        }
    }
}

/// Decoded body of a result record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultBody {
    SystemInformation(SystemInformation),
    HResult { code: u32 },
    OutputStream(String),
    ErrorStream(String),
    /// File bytes are the raw payload
    File,
    FileInformation(FileInformation),
}

// =============================================================================
// Result Record
// =============================================================================

/// A decoded result record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SirepResult {
    result_type: ResultType,
    payload: Vec<u8>,
    body: ResultBody,
}

impl SirepResult {
    /// Decode a payload of the given type
    pub fn parse(result_type: ResultType, payload: Vec<u8>) -> Result<Self> {
        match result_type {
            ResultType::HResult => Self::hresult(payload),
            ResultType::OutputStream => Self::output_stream(payload),
            ResultType::ErrorStream => Self::error_stream(payload),
            ResultType::File => Self::file(payload),
            ResultType::FileInformation => Self::file_information(payload),
            ResultType::SystemInformation => Self::system_information(payload),
        }
    }

    pub fn system_information(payload: Vec<u8>) -> Result<Self> {
        let payload = clamp(ResultType::SystemInformation, payload);
        let info = SystemInformation::parse(&payload)?;
        Ok(Self::new(ResultType::SystemInformation, payload, ResultBody::SystemInformation(info)))
    }

    pub fn hresult(payload: Vec<u8>) -> Result<Self> {
        let payload = clamp(ResultType::HResult, payload);
        let code = FieldReader::new(&payload).u32("hresult")?;
        Ok(Self::new(ResultType::HResult, payload, ResultBody::HResult { code }))
    }

    pub fn output_stream(payload: Vec<u8>) -> Result<Self> {
        let text = String::from_utf8_lossy(&payload).into_owned();
        Ok(Self::new(ResultType::OutputStream, payload, ResultBody::OutputStream(text)))
    }

    pub fn error_stream(payload: Vec<u8>) -> Result<Self> {
        let text = String::from_utf8_lossy(&payload).into_owned();
        Ok(Self::new(ResultType::ErrorStream, payload, ResultBody::ErrorStream(text)))
    }

    pub fn file(payload: Vec<u8>) -> Result<Self> {
        Ok(Self::new(ResultType::File, payload, ResultBody::File))
    }

    pub fn file_information(payload: Vec<u8>) -> Result<Self> {
        let payload = clamp(ResultType::FileInformation, payload);
        let info = FileInformation::parse(&payload)?;
        Ok(Self::new(ResultType::FileInformation, payload, ResultBody::FileInformation(info)))
    }

    fn new(result_type: ResultType, payload: Vec<u8>, body: ResultBody) -> Self {
        Self {
            result_type,
            payload,
            body,
        }
    }

    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    /// Wire code of the record type
    pub fn type_code(&self) -> u32 {
        self.result_type.code()
    }

    /// Length of the interpreted payload
    pub fn payload_length(&self) -> usize {
        self.payload.len()
    }

    pub fn raw_payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn body(&self) -> &ResultBody {
        &self.body
    }

    /// Generic name → value view of the decoded fields
    pub fn fields(&self) -> BTreeMap<&'static str, FieldValue> {
        let mut kv = BTreeMap::new();
        match &self.body {
            ResultBody::SystemInformation(info) => info.fields(&mut kv),
            ResultBody::HResult { code } => {
                kv.insert("hresult", FieldValue::Text(hresult_hex(*code)));
            }
            ResultBody::OutputStream(text) => {
                kv.insert("output", FieldValue::Text(text.clone()));
            }
            ResultBody::ErrorStream(text) => {
                kv.insert("error", FieldValue::Text(text.clone()));
            }
            ResultBody::File => {
                kv.insert("data", FieldValue::Bytes(self.payload.clone()));
            }
            ResultBody::FileInformation(info) => info.fields(&mut kv),
        }
        kv
    }

    /// Payload as text when every byte is printable ASCII or whitespace
    pub fn printable_text(&self) -> Option<&str> {
        let printable = self
            .payload
            .iter()
            .all(|b| b.is_ascii_graphic() || b" \t\n\r\x0b\x0c".contains(b));
        if printable {
            std::str::from_utf8(&self.payload).ok()
        } else {
            None
        }
    }
}

impl fmt::Display for SirepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} | type: {}, payload length: {}, kv: {{",
            self.result_type.name(),
            self.type_code(),
            self.payload_length()
        )?;
        for (i, (name, value)) in self.fields().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        f.write_str("}>")
    }
}

/// Cut a payload down to the fixed size of its type, if any
fn clamp(result_type: ResultType, mut payload: Vec<u8>) -> Vec<u8> {
    if let Some(size) = result_type.fixed_size() {
        payload.truncate(size);
    }
    payload
}

// =============================================================================
// Fixed Layout Reader
// =============================================================================

/// Reads named little-endian fields, failing instead of running past the end
struct FieldReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            len: buf.len(),
        }
    }

    fn need(&self, field: &'static str, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(SirepError::MalformedField {
                index: None,
                field,
                offset: self.len - self.buf.remaining(),
                needed,
                available: self.len,
            });
        }
        Ok(())
    }

    fn u32(&mut self, field: &'static str) -> Result<u32> {
        self.need(field, 4)?;
        Ok(self.buf.get_u32_le())
    }

    fn u16(&mut self, field: &'static str) -> Result<u16> {
        self.need(field, 2)?;
        Ok(self.buf.get_u16_le())
    }

    fn u8(&mut self, field: &'static str) -> Result<u8> {
        self.need(field, 1)?;
        Ok(self.buf.get_u8())
    }
}
