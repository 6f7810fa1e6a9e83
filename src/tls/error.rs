//! Error type for the TLS trust subsystem.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    /// The chain contained no certificates.
    #[error("no certificate data found")]
    EmptyChain,

    /// Malformed certificate or key material, or a key that does not match
    /// the leaf certificate.
    #[error("invalid certificate material: {0}")]
    Parse(String),

    /// The leaf certificate carries no DNS subject alternative names.
    #[error("no DNS name specified")]
    NoHostnames,

    /// Path building or signature verification failed.
    #[error("certificate chain invalid: {0}")]
    ChainInvalid(#[source] webpki::Error),

    /// Certificate or key file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No TLS settings are configured for the listener.
    #[error("TLS is not configured")]
    NotConfigured,
}
