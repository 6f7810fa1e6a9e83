//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → axum-server accept loop
//!     → tls.rs (rustls handshake, certificate from ReloadableCert)
//!     → Hand off to HTTP router
//! ```
//!
//! # Design Decisions
//! - The resolver is consulted per handshake, so reloads apply to new
//!   connections without restarting the listener
//! - Existing connections keep the certificate they negotiated

pub mod tls;
