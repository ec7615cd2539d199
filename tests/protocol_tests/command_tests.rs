//! Command Tests
//!
//! Tests for command serialization, wire layout and decoding.

use sirepkit::protocol::wire::{encode_utf16, pack_string, unpack_u32};
use sirepkit::protocol::{
    decode_command, Command, CommandType, LaunchCommand, HEADER_SIZE,
    IMPERSONATE_LOGGED_ON_USER_PREFIX,
};

fn header(bytes: &[u8]) -> (u32, u32) {
    (unpack_u32(&bytes[0..4]).unwrap(), unpack_u32(&bytes[4..8]).unwrap())
}

fn sample_commands() -> Vec<Command> {
    vec![
        Command::LaunchCommandWithOutput(
            LaunchCommand::new("c:\\windows\\system32\\cmd.exe")
                .return_output(true)
                .parameters("/c echo %userprofile%")
                .base_directory("c:\\data"),
        ),
        Command::PutFileOnDevice {
            remote_path: "C:\\Data\\Users\\Public\\note.txt".to_string(),
            data: "hello\r\nworld".to_string(),
        },
        Command::GetFileFromDevice {
            remote_path: "C:\\Windows\\System32\\hostname.exe".to_string(),
        },
        Command::GetFileInformationFromDevice {
            remote_path: "C:\\Windows\\System32\\drivers\\etc\\hosts".to_string(),
        },
        Command::GetSystemInformationFromDevice,
    ]
}

// =============================================================================
// Command Type Tests
// =============================================================================

#[test]
fn test_command_type_codes() {
    assert_eq!(CommandType::LaunchCommandWithOutput.code(), 0x0A);
    assert_eq!(CommandType::PutFileOnDevice.code(), 0x14);
    assert_eq!(CommandType::GetFileFromDevice.code(), 0x1E);
    assert_eq!(CommandType::GetFileInformationFromDevice.code(), 0x28);
    assert_eq!(CommandType::GetSystemInformationFromDevice.code(), 0x32);
}

#[test]
fn test_command_type_lookup_is_complete() {
    for command_type in CommandType::ALL {
        assert_eq!(CommandType::from_code(command_type.code()), Some(command_type));
        assert_eq!(command_type.name().parse::<CommandType>().unwrap(), command_type);
    }
    assert_eq!(CommandType::from_code(0xFFFF_FFFF), None);
    assert!("NoSuchCommand".parse::<CommandType>().is_err());
}

#[test]
fn test_every_command_type_has_a_variant() {
    let commands = sample_commands();
    for command_type in CommandType::ALL {
        assert!(
            commands.iter().any(|c| c.command_type() == command_type),
            "no sample for {}",
            command_type
        );
    }
}

// =============================================================================
// Header Invariant Tests
// =============================================================================

#[test]
fn test_payload_length_matches_body() {
    for command in sample_commands() {
        let bytes = command.serialize();
        let (code, payload_len) = header(&bytes);
        assert_eq!(code, command.command_type().code());
        assert_eq!(payload_len as usize, bytes.len() - HEADER_SIZE, "{:?}", command);
    }
}

// =============================================================================
// Wire Format Verification Tests
// =============================================================================

#[test]
fn test_wire_format_get_system_information() {
    let bytes = Command::GetSystemInformationFromDevice.serialize();
    assert_eq!(bytes, vec![0x32, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_wire_format_get_file() {
    let bytes = Command::GetFileFromDevice {
        remote_path: "ab".to_string(),
    }
    .serialize();

    // [type 0x1E][payload_len 8][str_len 4][a \0 b \0]
    assert_eq!(
        bytes,
        vec![0x1E, 0, 0, 0, 8, 0, 0, 0, 4, 0, 0, 0, b'a', 0, b'b', 0]
    );
}

#[test]
fn test_wire_format_put_file() {
    let bytes = Command::PutFileOnDevice {
        remote_path: "p".to_string(),
        data: "dd".to_string(),
    }
    .serialize();

    let mut expected = vec![0x14, 0, 0, 0];
    expected.extend_from_slice(&(6u32 + 4 + 8).to_le_bytes());
    expected.extend_from_slice(&pack_string("p"));
    expected.extend_from_slice(&[1, 0, 0, 0]); // regular chunk
    expected.extend_from_slice(&pack_string("dd"));
    assert_eq!(bytes, expected);
}

#[test]
fn test_wire_format_launch() {
    let bytes = Command::LaunchCommandWithOutput(LaunchCommand::new("cmd").return_output(true))
        .serialize();

    let (code, payload_len) = header(&bytes);
    assert_eq!(code, 0x0A);
    assert_eq!(payload_len, 8 + 28 + 6);

    let payload = &bytes[HEADER_SIZE..];
    let words: Vec<u32> = payload[..36]
        .chunks_exact(4)
        .map(|w| unpack_u32(w).unwrap())
        .collect();
    assert_eq!(
        words,
        vec![
            1, 1, // return error, return output
            0x24, 6, // command line
            0x2A, 0, // parameters
            0x2A, 0, // base directory
            0, // sentinel
        ]
    );
    assert_eq!(&payload[36..], encode_utf16("cmd").as_slice());
}

#[test]
fn test_launch_return_output_flag_off() {
    let bytes =
        Command::LaunchCommandWithOutput(LaunchCommand::new("x").return_output(false)).serialize();
    let payload = &bytes[HEADER_SIZE..];
    assert_eq!(unpack_u32(&payload[0..4]), Some(1));
    assert_eq!(unpack_u32(&payload[4..8]), Some(0));
}

#[test]
fn test_launch_impersonation_prefix_counts_in_offsets() {
    let launch = LaunchCommand::new("cmd.exe")
        .as_logged_on_user(true)
        .parameters("/c dir");
    let expected_cmd = format!("{}cmd.exe", IMPERSONATE_LOGGED_ON_USER_PREFIX);
    assert_eq!(launch.wire_command_line(), expected_cmd);

    let bytes = Command::LaunchCommandWithOutput(launch).serialize();
    let payload = &bytes[HEADER_SIZE..];
    let cmd_len = unpack_u32(&payload[12..16]).unwrap();
    let params_offset = unpack_u32(&payload[16..20]).unwrap();
    assert_eq!(cmd_len as usize, expected_cmd.len() * 2);
    assert_eq!(params_offset, 0x24 + cmd_len);
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_round_trip_all_commands() {
    for command in sample_commands() {
        let decoded = decode_command(&command.serialize()).unwrap();
        assert_eq!(decoded, command);
    }
}

#[test]
fn test_round_trip_impersonated_launch() {
    let command = Command::LaunchCommandWithOutput(
        LaunchCommand::new("cmd.exe")
            .as_logged_on_user(true)
            .parameters("/c whoami"),
    );
    assert_eq!(decode_command(&command.serialize()).unwrap(), command);
}

#[test]
fn test_marker_in_command_line_sets_impersonation() {
    let marked = format!("{}cmd.exe", IMPERSONATE_LOGGED_ON_USER_PREFIX);
    let launch = LaunchCommand::new(marked.as_str());
    assert_eq!(launch.command_line, "cmd.exe");
    assert!(launch.as_logged_on_user);
    assert_eq!(launch.wire_command_line(), marked);

    let command = Command::LaunchCommandWithOutput(launch);
    assert_eq!(decode_command(&command.serialize()).unwrap(), command);
}

#[test]
fn test_hand_built_marker_decodes_as_impersonated() {
    let launch = LaunchCommand {
        command_line: format!("{}x", IMPERSONATE_LOGGED_ON_USER_PREFIX),
        as_logged_on_user: false,
        ..LaunchCommand::default()
    };
    match decode_command(&Command::LaunchCommandWithOutput(launch).serialize()).unwrap() {
        Command::LaunchCommandWithOutput(decoded) => {
            assert_eq!(decoded.command_line, "x");
            assert!(decoded.as_logged_on_user);
        }
        other => panic!("Expected launch command, got {:?}", other),
    }
}

#[test]
fn test_round_trip_empty_strings() {
    let commands = vec![
        Command::PutFileOnDevice {
            remote_path: "f".to_string(),
            data: String::new(),
        },
        Command::LaunchCommandWithOutput(LaunchCommand::new("")),
        Command::GetFileFromDevice {
            remote_path: String::new(),
        },
    ];
    for command in commands {
        assert_eq!(decode_command(&command.serialize()).unwrap(), command);
    }
}

#[test]
fn test_decode_incomplete_header() {
    let result = decode_command(&[0x32, 0, 0]);
    assert!(result.unwrap_err().to_string().contains("Incomplete header"));
}

#[test]
fn test_decode_incomplete_payload() {
    let result = decode_command(&[0x1E, 0, 0, 0, 0x10, 0, 0, 0, 4, 0]);
    assert!(result.unwrap_err().to_string().contains("Incomplete payload"));
}

#[test]
fn test_decode_unknown_command_type() {
    let result = decode_command(&[0xFF, 0, 0, 0, 0, 0, 0, 0]);
    assert!(result.unwrap_err().to_string().contains("Unknown command type"));
}

#[test]
fn test_decode_system_information_with_payload() {
    let result = decode_command(&[0x32, 0, 0, 0, 2, 0, 0, 0, 1, 2]);
    assert!(result.unwrap_err().to_string().contains("unexpected payload"));
}
