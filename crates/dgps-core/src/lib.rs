//! # DGPS Core Library
//!
//! Driver for the Trimble BD982 GNSS receiver module on a serial link.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial link handling with timeout-bounded reads
//! - The `ENQ`/`ACK` liveness handshake
//! - `GETRAW` position queries with frame validation
//! - Bit-exact decoding of the receiver's Motorola-format fields
//! - Diagnostic events for every notable outcome
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dgps_core::{diagnostics::DiagnosticLog, protocol::Receiver};
//!
//! let log = Arc::new(DiagnosticLog::new());
//! let mut receiver = Receiver::open("/dev/ttyUSB0", 38400, log.clone())?;
//!
//! if receiver.probe().is_ready() {
//!     let fix = receiver.query_position()?;
//!     println!("{:.6} {:.6} ({} SVs)", fix.latitude, fix.longitude, fix.satellites.len());
//! }
//! ```

pub mod config;
pub mod diagnostics;
pub mod gps;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ReceiverConfig;
    pub use crate::diagnostics::{DiagnosticEvent, DiagnosticLog, DiagnosticSink, Severity};
    pub use crate::gps::{GpsFix, Satellite};
    pub use crate::protocol::{ProbeOutcome, QueryError, Receiver};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
