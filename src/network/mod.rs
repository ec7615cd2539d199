//! Network Module
//!
//! TCP session with a Sirep device.
//!
//! ## Architecture
//! - One session per command, blocking I/O on a single thread
//! - Results decoded through the protocol dispatch table as records arrive

mod session;

pub use session::{
    read_record, Banner, Exchange, NextRecord, Session, SessionState, Termination, BANNER_SIZE,
};
