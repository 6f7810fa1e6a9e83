//! Hot-reloadable server certificate.
//!
//! # Responsibilities
//! - Hold the certificate/key pair served to TLS handshakes
//! - Rebuild it from the configured PEM material on demand
//! - Resolve it for every handshake without locking
//!
//! # Design Decisions
//! - The active pair is an immutable snapshot behind `ArcSwapOption`
//! - Writers serialize on an async mutex; readers never touch it
//! - A failed rebuild leaves the previous snapshot in service

use arc_swap::ArcSwapOption;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::CertificateDer;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::TlsConfig;
use crate::observability::metrics;
use crate::tls::chain::CertificateInfo;
use crate::tls::error::TlsError;
use crate::tls::format::format_serial;

/// The certificate/key pair currently in service.
#[derive(Debug)]
pub struct ActiveCertificate {
    certified_key: Arc<CertifiedKey>,
    leaf: CertificateInfo,
    serial: String,
}

impl ActiveCertificate {
    pub fn certified_key(&self) -> &Arc<CertifiedKey> {
        &self.certified_key
    }

    /// Certificate chain as configured, leaf first.
    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.certified_key.cert
    }

    pub fn leaf(&self) -> &CertificateInfo {
        &self.leaf
    }

    /// Formatted leaf serial number.
    pub fn serial(&self) -> &str {
        &self.serial
    }
}

/// Clears the busy flag on every exit path.
struct InitGuard<'a>(&'a AtomicBool);

impl<'a> InitGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Server certificate that can be swapped while handshakes are in flight.
#[derive(Debug)]
pub struct ReloadableCert {
    active: ArcSwapOption<ActiveCertificate>,
    settings: ArcSwapOption<TlsConfig>,
    init_lock: Mutex<()>,
    initializing: AtomicBool,
    provider: Arc<CryptoProvider>,
}

impl ReloadableCert {
    /// Create a resolver with no active certificate.
    pub fn new(settings: Option<TlsConfig>) -> Self {
        Self {
            active: ArcSwapOption::empty(),
            settings: ArcSwapOption::from(settings.map(Arc::new)),
            init_lock: Mutex::new(()),
            initializing: AtomicBool::new(false),
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        }
    }

    /// Current snapshot, if any certificate was ever initialized.
    pub fn active(&self) -> Option<Arc<ActiveCertificate>> {
        self.active.load_full()
    }

    /// Certified key for a handshake. Never blocks.
    pub fn current(&self) -> Option<Arc<CertifiedKey>> {
        self.active
            .load()
            .as_ref()
            .map(|active| Arc::clone(&active.certified_key))
    }

    /// True while `trigger_init` is running.
    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::SeqCst)
    }

    /// TLS settings the next `trigger_init` will load from.
    pub fn settings(&self) -> Option<Arc<TlsConfig>> {
        self.settings.load_full()
    }

    /// Replace the TLS settings used by the next `trigger_init`.
    pub fn update_settings(&self, settings: Option<TlsConfig>) {
        self.settings.store(settings.map(Arc::new));
    }

    /// Load the configured PEM material and publish it as the active certificate.
    ///
    /// On error the previously active certificate, if any, stays in service.
    pub async fn trigger_init(&self) -> Result<(), TlsError> {
        let _lock = self.init_lock.lock().await;
        let _busy = InitGuard::enter(&self.initializing);

        match self.build().await {
            Ok(active) => {
                let serial = active.serial.clone();
                self.active.store(Some(Arc::new(active)));
                tracing::info!(serial = %serial, "TLS certificate #{} initialized", serial);
                metrics::record_cert_reload(true);
                Ok(())
            }
            Err(e) => {
                metrics::record_cert_reload(false);
                Err(e)
            }
        }
    }

    async fn build(&self) -> Result<ActiveCertificate, TlsError> {
        let settings = self.settings.load_full().ok_or(TlsError::NotConfigured)?;

        let cert_pem = read_source(settings.cert.as_deref(), settings.cert_path.as_deref()).await?;
        let key_pem = read_source(settings.key.as_deref(), settings.key_path.as_deref()).await?;

        let chain = rustls_pemfile::certs(&mut cert_pem.as_slice())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::Parse(e.to_string()))?;
        if chain.is_empty() {
            return Err(TlsError::Parse("no certificate PEM block found".to_string()));
        }
        let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
            .map_err(|e| TlsError::Parse(e.to_string()))?
            .ok_or_else(|| TlsError::Parse("no private key PEM block found".to_string()))?;

        let certified_key = CertifiedKey::from_der(chain, key, &self.provider)
            .map_err(|e| TlsError::Parse(e.to_string()))?;
        let leaf_der = certified_key.cert.first().ok_or(TlsError::EmptyChain)?;
        let leaf = CertificateInfo::from_der(leaf_der)?;

        Ok(ActiveCertificate {
            serial: format_serial(&leaf.serial),
            certified_key: Arc::new(certified_key),
            leaf,
        })
    }
}

impl ResolvesServerCert for ReloadableCert {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        self.current()
    }
}

/// Inline PEM wins over a file path.
async fn read_source(inline: Option<&str>, path: Option<&str>) -> Result<Vec<u8>, TlsError> {
    if let Some(pem) = inline {
        return Ok(pem.as_bytes().to_vec());
    }
    let path = path.ok_or(TlsError::NotConfigured)?;
    tokio::fs::read(path).await.map_err(|source| TlsError::Io {
        path: Path::new(path).to_path_buf(),
        source,
    })
}
