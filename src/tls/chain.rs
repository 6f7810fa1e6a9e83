//! Certificate chain verification.
//!
//! # Responsibilities
//! - Parse the configured chain (leaf first)
//! - Refuse leaves without DNS names
//! - Split CA certificates into intermediate and root pools
//! - Verify the leaf against the pools at the current time
//! - Report the path webpki verified, not one rebuilt from names
//!
//! # Design Decisions
//! - Self-issued CAs (issuer CN == subject CN) are roots, other CAs intermediates
//! - An empty root pool falls back to the Mozilla root set
//! - No retries, no shared state

use chrono::{DateTime, Utc};
use rustls::pki_types::{CertificateDer, TrustAnchor, UnixTime};
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::{FromDer, X509Certificate, X509Name};
use x509_parser::time::ASN1Time;

use crate::tls::error::TlsError;

/// Parsed view of one certificate in a chain.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    /// Raw DER encoding.
    pub der: CertificateDer<'static>,
    /// Subject common name (empty when absent).
    pub subject: String,
    /// Issuer common name (empty when absent).
    pub issuer: String,
    /// Serial number, big-endian.
    pub serial: Vec<u8>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Basic constraints CA flag.
    pub is_ca: bool,
    /// DNS subject alternative names.
    pub dns_names: Vec<String>,
}

impl CertificateInfo {
    /// Parse a DER encoded certificate.
    pub fn from_der(der: &CertificateDer<'_>) -> Result<Self, TlsError> {
        let (_, cert) = X509Certificate::from_der(der.as_ref())
            .map_err(|e| TlsError::Parse(e.to_string()))?;

        let dns_names = match cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => return Err(TlsError::Parse(e.to_string())),
        };
        let is_ca = match cert.basic_constraints() {
            Ok(Some(bc)) => bc.value.ca,
            Ok(None) => false,
            Err(e) => return Err(TlsError::Parse(e.to_string())),
        };

        Ok(Self {
            der: der.clone().into_owned(),
            subject: common_name(cert.subject()),
            issuer: common_name(cert.issuer()),
            serial: cert.raw_serial().to_vec(),
            not_before: to_utc(&cert.validity().not_before)?,
            not_after: to_utc(&cert.validity().not_after)?,
            is_ca,
            dns_names,
        })
    }

    /// Issuer and subject common names match.
    pub fn is_self_issued(&self) -> bool {
        self.issuer == self.subject
    }

    /// A self-issued CA.
    pub fn is_root(&self) -> bool {
        self.is_ca && self.is_self_issued()
    }
}

fn common_name(name: &X509Name<'_>) -> String {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn to_utc(time: &ASN1Time) -> Result<DateTime<Utc>, TlsError> {
    DateTime::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| TlsError::Parse(format!("timestamp out of range: {}", time)))
}

/// A chain whose path to a trust anchor has been verified, leaf first.
#[derive(Debug, Clone)]
pub struct VerifiedChain {
    certs: Vec<CertificateInfo>,
}

impl VerifiedChain {
    pub(crate) fn from_certs(certs: Vec<CertificateInfo>) -> Self {
        Self { certs }
    }

    pub fn certs(&self) -> &[CertificateInfo] {
        &self.certs
    }

    pub fn leaf(&self) -> Option<&CertificateInfo> {
        self.certs.first()
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

/// CA certificates of a chain, split by self-issuance.
#[derive(Debug, Default)]
struct CertPools {
    intermediates: Vec<CertificateInfo>,
    roots: Vec<CertificateInfo>,
}

impl CertPools {
    fn split(chain: &[CertificateDer<'_>]) -> Result<Self, TlsError> {
        let mut pools = Self::default();
        for der in chain {
            let cert = CertificateInfo::from_der(der)?;
            if !cert.is_ca {
                continue;
            }
            if cert.is_self_issued() {
                pools.roots.push(cert);
            } else {
                pools.intermediates.push(cert);
            }
        }
        Ok(pools)
    }
}

/// Verify a chain against the current wall-clock time.
pub fn verify(chain: &[CertificateDer<'_>]) -> Result<VerifiedChain, TlsError> {
    verify_at(chain, UnixTime::now())
}

/// Verify a chain as of `now`.
pub fn verify_at(chain: &[CertificateDer<'_>], now: UnixTime) -> Result<VerifiedChain, TlsError> {
    let leaf_der = chain.first().ok_or(TlsError::EmptyChain)?;
    let leaf = CertificateInfo::from_der(leaf_der)?;
    if leaf.dns_names.is_empty() {
        return Err(TlsError::NoHostnames);
    }

    let pools = CertPools::split(chain)?;

    let anchors: Vec<TrustAnchor<'_>> = if pools.roots.is_empty() {
        webpki_roots::TLS_SERVER_ROOTS.to_vec()
    } else {
        pools
            .roots
            .iter()
            .map(|root| webpki::anchor_from_trusted_cert(&root.der))
            .collect::<Result<_, _>>()
            .map_err(TlsError::ChainInvalid)?
    };
    let intermediates: Vec<CertificateDer<'_>> = pools
        .intermediates
        .iter()
        .map(|cert| cert.der.clone())
        .collect();

    let end_entity =
        webpki::EndEntityCert::try_from(leaf_der).map_err(TlsError::ChainInvalid)?;
    let algorithms = rustls::crypto::ring::default_provider()
        .signature_verification_algorithms
        .all;

    let path = end_entity
        .verify_for_usage(
            algorithms,
            &anchors,
            &intermediates,
            now,
            webpki::KeyUsage::server_auth(),
            None,
            None,
        )
        .map_err(TlsError::ChainInvalid)?;

    let mut certs = vec![leaf];
    for cert in path.intermediate_certificates() {
        certs.push(CertificateInfo::from_der(&cert.der())?);
    }
    if let Some(root) = anchored_root(&pools.roots, &anchors, path.anchor()) {
        certs.push(root.clone());
    }

    Ok(VerifiedChain::from_certs(certs))
}

/// The pooled root the path was anchored on.
///
/// `None` when the anchor came from the fallback root set, which carries no
/// certificate to report on.
fn anchored_root<'a>(
    roots: &'a [CertificateInfo],
    anchors: &[TrustAnchor<'_>],
    anchor: &TrustAnchor<'_>,
) -> Option<&'a CertificateInfo> {
    roots
        .iter()
        .zip(anchors)
        .find(|(_, candidate)| {
            candidate.subject == anchor.subject
                && candidate.subject_public_key_info == anchor.subject_public_key_info
        })
        .map(|(root, _)| root)
}
