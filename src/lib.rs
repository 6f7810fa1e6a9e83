//! TLS trust layer for the reverse proxy.
//!
//! Owns the certificate presented to clients, verifies its chain of trust,
//! monitors its remaining validity and sequences all of it against the
//! process lifecycle.

pub mod admin;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod tls;

pub use config::schema::ProxyConfig;
pub use lifecycle::{LifecycleState, Runtime, StateCoordinator};
pub use tls::ReloadableCert;
