//! Result Tests
//!
//! Tests for result payload parsing and the name → value field view.

use chrono::{TimeZone, Utc};
use sirepkit::protocol::wire::EPOCH_FILETIME;
use sirepkit::protocol::{
    FieldValue, ResultBody, ResultType, SirepResult, FILE_INFORMATION_SIZE,
    OS_VERSION_INFO_EX_SIZE,
};
use sirepkit::SirepError;

fn words(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn system_information_payload() -> Vec<u8> {
    let mut payload = words(&[0x11C, 10, 0, 17763, 2, 0]);
    payload.extend_from_slice(&1u16.to_le_bytes());
    payload.extend_from_slice(&2u16.to_le_bytes());
    payload.extend_from_slice(&0x0100u16.to_le_bytes());
    payload.push(1);
    payload.push(0);
    payload
}

/// FILETIME split into (low, high) for a unix timestamp
fn filetime(seconds: u64) -> (u32, u32) {
    let value = EPOCH_FILETIME + seconds * 10_000_000;
    (value as u32, (value >> 32) as u32)
}

fn file_information_payload(hresult: u32, size_low: u32, size_high: u32) -> Vec<u8> {
    let created = filetime(1_500_000_000);
    let accessed = filetime(1_500_000_100);
    let written = filetime(1_500_000_200);
    words(&[
        hresult, 0x20, size_low, size_high, created.0, created.1, accessed.0, accessed.1,
        written.0, written.1,
    ])
}

// =============================================================================
// Result Type Tests
// =============================================================================

#[test]
fn test_result_type_codes() {
    assert_eq!(ResultType::HResult.code(), 1);
    assert_eq!(ResultType::OutputStream.code(), 11);
    assert_eq!(ResultType::ErrorStream.code(), 12);
    assert_eq!(ResultType::File.code(), 31);
    assert_eq!(ResultType::FileInformation.code(), 41);
    assert_eq!(ResultType::SystemInformation.code(), 51);
}

#[test]
fn test_fixed_sizes() {
    assert_eq!(ResultType::SystemInformation.fixed_size(), Some(0x20));
    assert_eq!(ResultType::FileInformation.fixed_size(), Some(0x28));
    assert_eq!(ResultType::File.fixed_size(), None);
    assert_eq!(ResultType::OutputStream.fixed_size(), None);
}

// =============================================================================
// System Information Tests
// =============================================================================

#[test]
fn test_system_information_fields() {
    let payload = system_information_payload();
    assert_eq!(payload.len(), OS_VERSION_INFO_EX_SIZE);

    let result = SirepResult::system_information(payload).unwrap();
    assert_eq!(result.result_type(), ResultType::SystemInformation);
    assert_eq!(result.payload_length(), 0x20);

    let fields = result.fields();
    assert_eq!(fields.len(), 11);
    assert_eq!(fields["os_version_info_size"], FieldValue::Unsigned(0x11C));
    assert_eq!(fields["major_version"], FieldValue::Unsigned(10));
    assert_eq!(fields["minor_version"], FieldValue::Unsigned(0));
    assert_eq!(fields["build_number"], FieldValue::Unsigned(17763));
    assert_eq!(fields["platform_id"], FieldValue::Unsigned(2));
    assert_eq!(fields["csd_version"], FieldValue::Unsigned(0));
    assert_eq!(fields["service_pack_major"], FieldValue::Unsigned(1));
    assert_eq!(fields["service_pack_minor"], FieldValue::Unsigned(2));
    assert_eq!(fields["suite_mask"], FieldValue::Unsigned(0x0100));
    assert_eq!(fields["product_type"], FieldValue::Unsigned(1));
    assert_eq!(fields["reserved"], FieldValue::Unsigned(0));
}

#[test]
fn test_system_information_over_length_payload_is_cut() {
    let mut payload = system_information_payload();
    payload.extend_from_slice(&[0xEE; 12]);

    let result = SirepResult::system_information(payload).unwrap();
    assert_eq!(result.payload_length(), OS_VERSION_INFO_EX_SIZE);
    assert!(!result.raw_payload().contains(&0xEE));
}

#[test]
fn test_system_information_short_payload() {
    let payload = words(&[0x11C, 10, 0, 17763, 2, 0]);
    let err = SirepResult::system_information(payload).unwrap_err();
    match err {
        SirepError::MalformedField {
            index,
            field,
            offset,
            available,
            ..
        } => {
            assert_eq!(index, None);
            assert_eq!(field, "service_pack_major");
            assert_eq!(offset, 24);
            assert_eq!(available, 24);
        }
        other => panic!("Expected MalformedField, got {:?}", other),
    }
}

// =============================================================================
// File Information Tests
// =============================================================================

#[test]
fn test_file_information_success() {
    let payload = file_information_payload(0, 100, 0);
    assert_eq!(payload.len(), FILE_INFORMATION_SIZE);

    let result = SirepResult::file_information(payload).unwrap();
    let fields = result.fields();

    assert_eq!(fields["hresult"], FieldValue::Text("0x0".to_string()));
    assert_eq!(fields["file_attributes"], FieldValue::Unsigned(0x20));
    assert_eq!(fields["file_size"], FieldValue::Unsigned(100));
    assert_eq!(
        fields["time_created"],
        FieldValue::Timestamp(Utc.timestamp_opt(1_500_000_000, 0).unwrap())
    );
    assert_eq!(
        fields["time_last_access"],
        FieldValue::Timestamp(Utc.timestamp_opt(1_500_000_100, 0).unwrap())
    );
    assert_eq!(
        fields["time_last_write"],
        FieldValue::Timestamp(Utc.timestamp_opt(1_500_000_200, 0).unwrap())
    );
}

#[test]
fn test_file_information_large_size() {
    let result = SirepResult::file_information(file_information_payload(0, 1, 1)).unwrap();
    assert_eq!(result.fields()["file_size"], FieldValue::Unsigned((1u64 << 32) | 1));
}

#[test]
fn test_file_information_failure_hides_details() {
    let result =
        SirepResult::file_information(file_information_payload(0x8007_0002, 100, 0)).unwrap();
    let fields = result.fields();

    assert_eq!(fields["hresult"], FieldValue::Text("0x80070002".to_string()));
    for absent in ["file_size", "time_created", "time_last_access", "time_last_write"] {
        assert!(!fields.contains_key(absent), "{} should be absent", absent);
    }

    match result.body() {
        ResultBody::FileInformation(info) => {
            assert_eq!(info.hresult, 0x8007_0002);
            assert!(info.details.is_none());
        }
        other => panic!("Expected FileInformation, got {:?}", other),
    }
}

#[test]
fn test_file_information_short_payload() {
    let err = SirepResult::file_information(words(&[0, 0x20, 100])).unwrap_err();
    assert!(matches!(
        err,
        SirepError::MalformedField {
            field: "file_size_high",
            ..
        }
    ));
}

// =============================================================================
// Stream, File and HResult Tests
// =============================================================================

#[test]
fn test_hresult() {
    let result = SirepResult::hresult(words(&[0x8000_4005])).unwrap();
    assert_eq!(result.body(), &ResultBody::HResult { code: 0x8000_4005 });
    assert_eq!(
        result.fields()["hresult"],
        FieldValue::Text("0x80004005".to_string())
    );
}

#[test]
fn test_output_and_error_streams() {
    let out = SirepResult::output_stream(b"Volume in drive C\r\n".to_vec()).unwrap();
    assert_eq!(out.result_type(), ResultType::OutputStream);
    assert_eq!(
        out.fields()["output"],
        FieldValue::Text("Volume in drive C\r\n".to_string())
    );
    assert_eq!(out.printable_text(), Some("Volume in drive C\r\n"));

    let err = SirepResult::error_stream(b"Access is denied.".to_vec()).unwrap();
    assert_eq!(err.result_type(), ResultType::ErrorStream);
    assert_eq!(
        err.fields()["error"],
        FieldValue::Text("Access is denied.".to_string())
    );
}

#[test]
fn test_file_bytes_returned_as_is() {
    let data: Vec<u8> = (0..=255).collect();
    let result = SirepResult::file(data.clone()).unwrap();
    assert_eq!(result.raw_payload(), data.as_slice());
    assert_eq!(result.payload_length(), 256);
    assert_eq!(result.fields()["data"], FieldValue::Bytes(data));
    assert_eq!(result.printable_text(), None);
}

#[test]
fn test_parse_by_type_matches_constructors() {
    let payload = system_information_payload();
    assert_eq!(
        SirepResult::parse(ResultType::SystemInformation, payload.clone()).unwrap(),
        SirepResult::system_information(payload).unwrap()
    );
}

#[test]
fn test_display_format() {
    let result = SirepResult::hresult(words(&[0])).unwrap();
    assert_eq!(
        result.to_string(),
        "<HResultResult | type: 1, payload length: 4, kv: {hresult: \"0x0\"}>"
    );
}
