//! TLS trust subsystem.
//!
//! # Data Flow
//! ```text
//! PEM cert chain + key (config)
//!     → reloadable.rs (build certified key, publish snapshot)
//!     → TLS listener resolves the snapshot on every handshake
//!
//! Active certificate chain
//!     → chain.rs (parse, pool CAs, verify path)
//!     → analytics.rs (per-link validity facts, earliest expiry)
//!     → ChainReport (composite message, Debug or Warn)
//! ```
//!
//! # Design Decisions
//! - Handshake readers never take a lock; reloads swap an immutable snapshot
//! - A reload publishes only after the new key pair is fully validated
//! - Verification is a pure function of the chain and the clock

pub mod analytics;
pub mod chain;
pub mod error;
pub mod format;
pub mod reloadable;

pub use analytics::{analyze, CertRole, ChainReport, PDuration, Severity, TlsLink};
pub use chain::{verify, CertificateInfo, VerifiedChain};
pub use error::TlsError;
pub use reloadable::{ActiveCertificate, ReloadableCert};

use rustls::pki_types::CertificateDer;

/// Verify a chain and analyse the verified path in one step.
pub fn inspect(chain: &[CertificateDer<'_>]) -> Result<ChainReport, TlsError> {
    let verified = verify(chain)?;
    Ok(ChainReport::new(analyze(&verified)))
}
