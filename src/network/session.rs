//! Session
//!
//! Drives one command exchange with a device:
//!
//! ```text
//! Disconnected ──connect──▶ Connected ──send──▶ AwaitingRecords ──receive──▶ Closed
//!       │                       │                                             ▲
//!       └───────── failure ─────┴─────────────────────────────────────────────┘
//! ```
//!
//! The device never announces how many records it will send. The stream ends
//! on a zero-length record, when the peer closes, or after a read stays idle
//! for the configured read timeout.

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use crate::config::Config;
use crate::error::{Result, SirepError};
use crate::hexdump::{hex_prefix, hex_string};
use crate::protocol::{decode_record, Command, Record, SirepResult};

/// Length of the version GUID the device sends on connect
pub const BANNER_SIZE: usize = 0x10;

/// Service banner (protocol version GUID)
pub type Banner = [u8; BANNER_SIZE];

/// Phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    AwaitingRecords,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Connected => "Connected",
            SessionState::AwaitingRecords => "AwaitingRecords",
            SessionState::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// Why the record stream ended
#[derive(Debug)]
pub enum Termination {
    /// Zero-length record
    EndOfStream,

    /// Peer closed the connection between records
    PeerClosed,

    /// A read stayed idle for the read timeout. Indistinguishable from a
    /// stalled device that might still have more to send.
    IdleTimeout,

    /// A record could not be read or decoded
    Aborted(SirepError),
}

impl Termination {
    pub fn is_error(&self) -> bool {
        matches!(self, Termination::Aborted(_))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::EndOfStream => f.write_str("end of stream"),
            Termination::PeerClosed => f.write_str("peer closed connection"),
            Termination::IdleTimeout => f.write_str("idle timeout (device may still be sending)"),
            Termination::Aborted(e) => write!(f, "aborted: {}", e),
        }
    }
}

/// Outcome of one command exchange
#[derive(Debug)]
pub struct Exchange {
    /// Banner received during the handshake
    pub banner: Banner,

    /// Results in arrival order, including those decoded before an abort
    pub results: Vec<SirepResult>,

    /// How the record stream ended
    pub termination: Termination,
}

impl Exchange {
    /// Error that cut the record stream short, if any
    pub fn error(&self) -> Option<&SirepError> {
        match &self.termination {
            Termination::Aborted(e) => Some(e),
            _ => None,
        }
    }

    /// Results, or the error if the stream was aborted
    pub fn into_results(self) -> Result<Vec<SirepResult>> {
        match self.termination {
            Termination::Aborted(e) => Err(e),
            _ => Ok(self.results),
        }
    }
}

/// Result of reading at one record boundary
#[derive(Debug)]
pub enum NextRecord {
    Record(Record),
    End(Termination),
}

/// A single-use client session with one device
pub struct Session {
    /// Session configuration
    config: Config,

    /// Exclusively owned connection, present while Connected/AwaitingRecords
    stream: Option<TcpStream>,

    /// Current phase
    state: SessionState,
}

impl Session {
    /// Create a session; no connection is made yet
    pub fn new(config: Config) -> Self {
        Self {
            config,
            stream: None,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a whole exchange: handshake, send, collect records, close
    ///
    /// Connection, handshake and send failures are returned as `Err`. Record
    /// level failures end up in [`Exchange::termination`] next to the results
    /// decoded before them.
    pub fn execute(&mut self, command: &Command) -> Result<Exchange> {
        let banner = self.connect()?;
        self.send(command)?;
        let (results, termination) = self.receive()?;
        Ok(Exchange {
            banner,
            results,
            termination,
        })
    }

    /// Open the connection and read the banner
    pub fn connect(&mut self) -> Result<Banner> {
        self.expect_state(SessionState::Disconnected)?;

        let addr = self.config.address();
        tracing::debug!("Connecting to {}", addr);

        let mut stream = match open_stream(&self.config) {
            Ok(stream) => stream,
            Err(source) => {
                self.state = SessionState::Closed;
                return Err(SirepError::ConnectionFailure { addr, source });
            }
        };

        let handshake = read_banner(&mut stream);
        self.stream = Some(stream);
        self.state = SessionState::Connected;

        match handshake {
            Ok(banner) => {
                tracing::info!("Banner hex: {}", hex_string(&banner));
                Ok(banner)
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    /// Send the serialized command in full
    pub fn send(&mut self, command: &Command) -> Result<()> {
        self.expect_state(SessionState::Connected)?;

        let payload = command.serialize();
        tracing::info!("Sirep payload hex: {}", hex_string(&payload));
        tracing::debug!("Sending {} ({} bytes)", command.command_type(), payload.len());

        let sent = send_all(self.stream_in(SessionState::Connected)?, &payload);
        if let Err(e) = sent {
            self.close();
            return Err(e);
        }

        self.state = SessionState::AwaitingRecords;
        Ok(())
    }

    /// Collect records until the stream ends, then close
    pub fn receive(&mut self) -> Result<(Vec<SirepResult>, Termination)> {
        let max_payload = self.config.max_payload_size;
        let log_limit = self.config.log_data_truncation;
        let stream = self.stream_in(SessionState::AwaitingRecords)?;

        let mut results = Vec::new();
        let termination = loop {
            let record = match read_record(stream, results.len(), max_payload) {
                Ok(NextRecord::Record(record)) => record,
                Ok(NextRecord::End(termination)) => break termination,
                Err(e) => break Termination::Aborted(e),
            };

            tracing::info!(
                "Result record data hex: {}",
                hex_prefix(&record.payload, log_limit)
            );

            match decode_record(record) {
                Ok(result) => results.push(result),
                Err(e) => break Termination::Aborted(e),
            }
        };

        match &termination {
            Termination::IdleTimeout => {
                tracing::debug!("Timeout in command communication, assuming end of conversation")
            }
            Termination::Aborted(e) => {
                tracing::warn!("Record stream aborted after {} results: {}", results.len(), e)
            }
            other => tracing::debug!("Record stream ended: {}", other),
        }

        self.close();
        Ok((results, termination))
    }

    /// Close the connection; the session cannot be reused
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            tracing::debug!("Closing socket");
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.state = SessionState::Closed;
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        if self.state != expected {
            return Err(SirepError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn stream_in(&mut self, expected: SessionState) -> Result<&mut TcpStream> {
        let actual = self.state;
        match self.stream.as_mut() {
            Some(stream) if actual == expected => Ok(stream),
            _ => Err(SirepError::InvalidState { expected, actual }),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Stream helpers
// =============================================================================

/// Read the fixed-size banner the device sends on connect
fn read_banner<R: Read>(reader: &mut R) -> Result<Banner> {
    let mut banner = [0u8; BANNER_SIZE];
    let (received, source) = match fill(reader, &mut banner) {
        Fill::Complete => return Ok(banner),
        Fill::Eof(received) | Fill::TimedOut(received) => (received, None),
        Fill::Failed(received, e) => (received, Some(e)),
    };
    Err(SirepError::HandshakeFailure {
        received,
        expected: BANNER_SIZE,
        source,
    })
}

/// Read one record at a stream boundary
///
/// `index` is the record's position in the stream and is attached to any
/// error. A read timeout anywhere in the record ends the stream as
/// [`Termination::IdleTimeout`]; bytes of a partially received record are
/// dropped.
pub fn read_record<R: Read>(reader: &mut R, index: usize, max_payload: u32) -> Result<NextRecord> {
    let mut word = [0u8; 4];

    match fill(reader, &mut word) {
        Fill::Complete => {}
        Fill::Eof(0) => return Ok(NextRecord::End(Termination::PeerClosed)),
        Fill::TimedOut(received) => return Ok(idle(index, "result_type", received)),
        Fill::Eof(received) => return Err(truncated(index, "result_type", 4, received)),
        Fill::Failed(_, e) => return Err(e.into()),
    }
    let result_type = u32::from_le_bytes(word);
    tracing::debug!("Result record type: {}", result_type);

    match fill(reader, &mut word) {
        Fill::Complete => {}
        Fill::TimedOut(received) => return Ok(idle(index, "payload_length", 4 + received)),
        Fill::Eof(received) => return Err(truncated(index, "payload_length", 4, received)),
        Fill::Failed(_, e) => return Err(e.into()),
    }
    let payload_len = u32::from_le_bytes(word);
    if payload_len == 0 {
        return Ok(NextRecord::End(Termination::EndOfStream));
    }
    if payload_len > max_payload {
        return Err(SirepError::Protocol(format!(
            "Record #{}: payload too large: {} bytes (max {})",
            index, payload_len, max_payload
        )));
    }

    tracing::debug!("Receiving {} bytes", payload_len);
    let mut payload = vec![0u8; payload_len as usize];
    match fill(reader, &mut payload) {
        Fill::Complete => {}
        Fill::TimedOut(received) => return Ok(idle(index, "payload", 8 + received)),
        Fill::Eof(received) => {
            return Err(truncated(index, "payload", payload.len(), received));
        }
        Fill::Failed(_, e) => return Err(e.into()),
    }

    Ok(NextRecord::Record(Record {
        index,
        result_type,
        payload,
    }))
}

fn idle(index: usize, field: &'static str, dropped: usize) -> NextRecord {
    if dropped > 0 {
        tracing::warn!(
            "Read timeout in record #{} while reading {}, dropping {} partial bytes",
            index,
            field,
            dropped
        );
    }
    NextRecord::End(Termination::IdleTimeout)
}

fn truncated(index: usize, field: &'static str, expected: usize, received: usize) -> SirepError {
    SirepError::TruncatedRecord {
        index,
        field,
        expected,
        received,
    }
}

/// How far a buffer got filled
enum Fill {
    Complete,
    Eof(usize),
    TimedOut(usize),
    Failed(usize, io::Error),
}

/// Read until `buf` is full, the peer closes, a read times out or fails
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Fill {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Fill::Eof(filled),
            Ok(n) => filled += n,
            Err(e) => match e.kind() {
                ErrorKind::Interrupted => continue,
                // Windows reports TimedOut where Unix reports WouldBlock
                ErrorKind::WouldBlock | ErrorKind::TimedOut => return Fill::TimedOut(filled),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                    return Fill::Eof(filled);
                }
                _ => return Fill::Failed(filled, e),
            },
        }
    }
    Fill::Complete
}

/// Write all of `bytes`, resuming after partial writes
fn send_all<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    let total = bytes.len();
    let mut written = 0;
    while written < total {
        match writer.write(&bytes[written..]) {
            Ok(0) => {
                return Err(SirepError::SendFailure {
                    written,
                    total,
                    source: io::Error::from(ErrorKind::WriteZero),
                });
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(SirepError::SendFailure {
                    written,
                    total,
                    source,
                });
            }
        }
    }
    writer
        .flush()
        .map_err(|source| SirepError::SendFailure { written, total, source })
}

/// Connect to the first reachable address and apply timeouts
fn open_stream(config: &Config) -> io::Result<TcpStream> {
    let mut last_err = None;
    let mut connected = None;

    for addr in config.address().to_socket_addrs()? {
        let attempt = if config.connect_timeout_ms > 0 {
            TcpStream::connect_timeout(&addr, config.connect_timeout())
        } else {
            TcpStream::connect(addr)
        };
        match attempt {
            Ok(stream) => {
                connected = Some(stream);
                break;
            }
            Err(e) => last_err = Some(e),
        }
    }

    let stream = match connected {
        Some(stream) => stream,
        None => {
            return Err(last_err.unwrap_or_else(|| {
                io::Error::new(ErrorKind::InvalidInput, "address resolved to no targets")
            }));
        }
    };

    stream.set_nodelay(true)?;
    if config.read_timeout_ms > 0 {
        stream.set_read_timeout(Some(config.read_timeout()))?;
    }
    if config.write_timeout_ms > 0 {
        stream.set_write_timeout(Some(config.write_timeout()))?;
    }
    Ok(stream)
}
