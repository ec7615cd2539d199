//! Result dispatch table
//!
//! Maps a record's type code to the decoder for that result.

use super::codec::Record;
use super::result::{ResultType, SirepResult};
use crate::error::{Result, SirepError};

/// Builds a result from a record payload
pub type Decoder = fn(Vec<u8>) -> Result<SirepResult>;

/// Every supported result type and its decoder
pub static RESULT_DECODERS: [(ResultType, Decoder); 6] = [
    (ResultType::HResult, SirepResult::hresult as Decoder),
    (ResultType::OutputStream, SirepResult::output_stream as Decoder),
    (ResultType::ErrorStream, SirepResult::error_stream as Decoder),
    (ResultType::File, SirepResult::file as Decoder),
    (ResultType::FileInformation, SirepResult::file_information as Decoder),
    (ResultType::SystemInformation, SirepResult::system_information as Decoder),
];

/// Find the decoder registered for a wire type code
pub fn decoder_for(code: u32) -> Option<Decoder> {
    RESULT_DECODERS
        .iter()
        .find(|(result_type, _)| result_type.code() == code)
        .map(|&(_, decoder)| decoder)
}

/// Decode a record into its typed result
///
/// An unregistered type code is fatal for the record: once a type is
/// misclassified the rest of the stream cannot be trusted. Payload errors
/// carry the record's stream index.
pub fn decode_record(record: Record) -> Result<SirepResult> {
    let index = record.index;
    let decoder = decoder_for(record.result_type).ok_or(SirepError::UnknownResultType {
        index,
        code: record.result_type,
    })?;
    decoder(record.payload).map_err(|e| e.at_record(index))
}
