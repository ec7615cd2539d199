//! # sirepkit
//!
//! Client for the Sirep device control protocol:
//! - Command encoding (launch, file put/get/stat, system information)
//! - Typed decoding of the device's result record stream
//! - Single-command TCP exchange with handshake and stream termination
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Caller / CLI                             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Command
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Session                                 │
//! │     handshake → send → read records → close                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Record
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Codec    │          │  Dispatch   │
//!   │ (commands)  │          │  (results)  │
//!   └──────┬──────┘          └──────┬──────┘
//!          └────────────┬───────────┘
//!                       ▼
//!              ┌─────────────────┐
//!              │ Wire Primitives │
//!              └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod hexdump;
pub mod env_tokens;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SirepError, Result};
pub use config::{Config, SIREP_PORT};
pub use network::{Exchange, Session, SessionState, Termination};
pub use protocol::{Command, CommandType, LaunchCommand, ResultType, SirepResult};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of sirepkit
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
