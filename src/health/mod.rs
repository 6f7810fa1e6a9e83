//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Certificate checks (certificate.rs):
//!     Daemon phase reached
//!     → verify active chain
//!     → analyse validity
//!     → log report (debug, or warn under 30 days)
//!     → sleep 24h, repeat
//! ```
//!
//! # Design Decisions
//! - A bad check never ends the monitor or the process
//! - One-shot mode runs the same cycle once, for diagnostics and tests

pub mod certificate;

pub use certificate::{MonitorMode, TlsHealthMonitor};
