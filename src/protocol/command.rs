//! Command definitions
//!
//! Requests a client can send to the device.

use std::fmt;
use std::str::FromStr;

use crate::error::SirepError;

/// Prefix asking the device to run a launched program as the logged-on user
pub const IMPERSONATE_LOGGED_ON_USER_PREFIX: &str = "<AS_LOGGED_ON_USER>";

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CommandType {
    LaunchCommandWithOutput = 0x0A,
    PutFileOnDevice = 0x14,
    GetFileFromDevice = 0x1E,
    GetFileInformationFromDevice = 0x28,
    GetSystemInformationFromDevice = 0x32,
}

impl CommandType {
    /// Every command type, in wire code order
    pub const ALL: [CommandType; 5] = [
        CommandType::LaunchCommandWithOutput,
        CommandType::PutFileOnDevice,
        CommandType::GetFileFromDevice,
        CommandType::GetFileInformationFromDevice,
        CommandType::GetSystemInformationFromDevice,
    ];

    /// Look up a command type by wire code
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Wire code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Protocol name, as accepted on the command line
    pub fn name(self) -> &'static str {
        match self {
            CommandType::LaunchCommandWithOutput => "LaunchCommandWithOutput",
            CommandType::PutFileOnDevice => "PutFileOnDevice",
            CommandType::GetFileFromDevice => "GetFileFromDevice",
            CommandType::GetFileInformationFromDevice => "GetFileInformationFromDevice",
            CommandType::GetSystemInformationFromDevice => "GetSystemInformationFromDevice",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandType {
    type Err = SirepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| SirepError::Config(format!("Unknown command type: {}", s)))
    }
}

/// Kind of chunk carried by a file write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum WriteRecordType {
    RegularChunk = 0x01,
}

/// Arguments of a launch request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchCommand {
    /// Ask the device to stream the program's stdout back
    pub return_output: bool,

    /// Program path
    pub command_line: String,

    /// Run as the logged-on user instead of the service account
    pub as_logged_on_user: bool,

    /// Argument string, already token-substituted by the caller
    pub parameters: String,

    /// Working directory
    pub base_directory: String,
}

impl LaunchCommand {
    /// Launch request for `command_line`
    ///
    /// A leading impersonation marker is lifted into `as_logged_on_user`, so
    /// the stored command line never carries it.
    pub fn new(command_line: impl Into<String>) -> Self {
        let command_line = command_line.into();
        match command_line.strip_prefix(IMPERSONATE_LOGGED_ON_USER_PREFIX) {
            Some(program) => Self {
                command_line: program.to_string(),
                as_logged_on_user: true,
                ..Self::default()
            },
            None => Self {
                command_line,
                ..Self::default()
            },
        }
    }

    pub fn return_output(mut self, enabled: bool) -> Self {
        self.return_output = enabled;
        self
    }

    pub fn as_logged_on_user(mut self, enabled: bool) -> Self {
        self.as_logged_on_user = enabled;
        self
    }

    pub fn parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = parameters.into();
        self
    }

    pub fn base_directory(mut self, path: impl Into<String>) -> Self {
        self.base_directory = path.into();
        self
    }

    /// Command line as sent, impersonation marker included
    pub fn wire_command_line(&self) -> String {
        if self.as_logged_on_user {
            format!("{}{}", IMPERSONATE_LOGGED_ON_USER_PREFIX, self.command_line)
        } else {
            self.command_line.clone()
        }
    }
}

/// A Sirep request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a program, optionally streaming its output back
    LaunchCommandWithOutput(LaunchCommand),

    /// Write text data to a file on the device
    PutFileOnDevice { remote_path: String, data: String },

    /// Read a file from the device
    GetFileFromDevice { remote_path: String },

    /// Stat a file on the device
    GetFileInformationFromDevice { remote_path: String },

    /// Query OS version information
    GetSystemInformationFromDevice,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::LaunchCommandWithOutput(_) => CommandType::LaunchCommandWithOutput,
            Command::PutFileOnDevice { .. } => CommandType::PutFileOnDevice,
            Command::GetFileFromDevice { .. } => CommandType::GetFileFromDevice,
            Command::GetFileInformationFromDevice { .. } => {
                CommandType::GetFileInformationFromDevice
            }
            Command::GetSystemInformationFromDevice => {
                CommandType::GetSystemInformationFromDevice
            }
        }
    }

    /// Serialize to the wire format (header + payload)
    pub fn serialize(&self) -> Vec<u8> {
        super::codec::encode_command(self)
    }
}
