//! Shared fixtures for integration tests: throwaway PKIs built with rcgen.

#![allow(dead_code)]

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, SerialNumber,
};
use reverse_proxy_trust::config::{ProxyConfig, TlsConfig};
use rustls::pki_types::CertificateDer;
use time::{Duration, OffsetDateTime};

/// A certificate with its private key.
pub struct Issued {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Issued {
    pub fn der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    pub fn key_pem(&self) -> String {
        self.key.serialize_pem()
    }
}

/// Parameters for one test certificate.
pub struct Spec<'a> {
    pub common_name: &'a str,
    pub dns_names: &'a [&'a str],
    pub ca: bool,
    pub issued_days_ago: i64,
    pub expires_in_days: i64,
    pub serial: Option<&'a [u8]>,
}

impl<'a> Spec<'a> {
    pub fn leaf(common_name: &'a str, expires_in_days: i64) -> Self {
        Self {
            common_name,
            dns_names: &["localhost", "proxy.test"],
            ca: false,
            issued_days_ago: 1,
            expires_in_days,
            serial: None,
        }
    }

    pub fn ca(common_name: &'a str, expires_in_days: i64) -> Self {
        Self {
            common_name,
            dns_names: &[],
            ca: true,
            issued_days_ago: 1,
            expires_in_days,
            serial: None,
        }
    }

    fn params(&self) -> CertificateParams {
        let names: Vec<String> = self.dns_names.iter().map(|n| n.to_string()).collect();
        let mut params = CertificateParams::new(names).unwrap();

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, self.common_name);
        params.distinguished_name = dn;

        let now = OffsetDateTime::now_utc();
        params.not_before = now - Duration::days(self.issued_days_ago);
        params.not_after = now + Duration::days(self.expires_in_days);

        if self.ca {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        } else {
            params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        }
        if let Some(serial) = self.serial {
            params.serial_number = Some(SerialNumber::from_slice(serial));
        }
        params
    }

    pub fn self_signed(&self) -> Issued {
        let key = KeyPair::generate().unwrap();
        let cert = self.params().self_signed(&key).unwrap();
        Issued { cert, key }
    }

    pub fn signed_by(&self, issuer: &Issued) -> Issued {
        let key = KeyPair::generate().unwrap();
        let cert = self.params().signed_by(&key, &issuer.cert, &issuer.key).unwrap();
        Issued { cert, key }
    }
}

/// Root → intermediate → leaf.
pub struct TestPki {
    pub root: Issued,
    pub intermediate: Issued,
    pub leaf: Issued,
}

impl TestPki {
    /// Build a PKI whose certificates expire in the given number of days.
    pub fn new(leaf_days: i64, intermediate_days: i64, root_days: i64) -> Self {
        Self::with_leaf(Spec::leaf("proxy.test", leaf_days), intermediate_days, root_days)
    }

    pub fn with_leaf(leaf: Spec<'_>, intermediate_days: i64, root_days: i64) -> Self {
        let root = Spec::ca("Test Root CA", root_days).self_signed();
        let intermediate = Spec::ca("Test Intermediate CA", intermediate_days).signed_by(&root);
        let leaf = leaf.signed_by(&intermediate);
        Self {
            root,
            intermediate,
            leaf,
        }
    }

    /// Leaf first, as a server would present it.
    pub fn chain_der(&self) -> Vec<CertificateDer<'static>> {
        vec![self.leaf.der(), self.intermediate.der(), self.root.der()]
    }

    pub fn chain_pem(&self) -> String {
        format!("{}{}{}", self.leaf.pem(), self.intermediate.pem(), self.root.pem())
    }

    pub fn tls_config(&self) -> TlsConfig {
        inline_tls(self.chain_pem(), self.leaf.key_pem())
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.listener.tls = Some(self.tls_config());
        config
    }
}

pub fn inline_tls(cert: String, key: String) -> TlsConfig {
    TlsConfig {
        cert: Some(cert),
        key: Some(key),
        ..Default::default()
    }
}
