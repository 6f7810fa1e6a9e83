//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! State (state.rs):
//!     Bootstrap → Daemon → Shutdown, waiters park until a target phase
//!
//! Startup (startup.rs):
//!     Load config → Build reloadable certificate → First init → Runtime
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → set Shutdown
//!     SIGHUP → Trigger certificate reload
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then certificate, then listeners
//! - Startup fails if no certificate ever became active
//! - Background tasks gate on the Daemon phase instead of polling

pub mod signals;
pub mod startup;
pub mod state;

pub use startup::{bootstrap, Runtime, StartupError};
pub use state::{LifecycleState, StateCoordinator};
