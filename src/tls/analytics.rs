//! Validity analytics for verified certificate chains.
//!
//! # Responsibilities
//! - Derive per-certificate validity facts (remaining, total, browser policy)
//! - Flag the certificate that expires first
//! - Build the human readable chain summary and pick its severity
//!
//! # Design Decisions
//! - Durations are signed; an expired browser grace period is negative
//! - Earliest expiry uses a strict minimum, so the first of equal links wins

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::time::Duration;

use crate::tls::chain::{CertificateInfo, VerifiedChain};
use crate::tls::format::{format_serial, sha1_fingerprint};

/// Maximum lifetime browsers accept for publicly trusted leaf certificates.
pub const BROWSER_MAX_VALIDITY_DAYS: i64 = 398;

/// Reports for chains expiring sooner than this are logged at warn.
pub const WARN_THRESHOLD_DAYS: i64 = 30;

/// A signed duration with human readable rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PDuration(TimeDelta);

impl PDuration {
    pub fn days(days: i64) -> Self {
        Self(TimeDelta::days(days))
    }

    pub fn as_duration(&self) -> TimeDelta {
        self.0
    }

    /// Whole days, truncated towards zero.
    pub fn as_days(&self) -> i64 {
        self.0.num_days()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < TimeDelta::zero()
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Render the two most significant units, e.g. `1year 1month`.
    ///
    /// Sub-second precision is dropped; negative durations get a `-` prefix.
    pub fn humanize(&self) -> String {
        let secs = self.0.num_seconds();
        let formatted =
            humantime::format_duration(Duration::from_secs(secs.unsigned_abs())).to_string();
        let leading: Vec<&str> = formatted.split_whitespace().take(2).collect();
        let sign = if secs < 0 { "-" } else { "" };
        format!("{}{}", sign, leading.join(" "))
    }
}

impl From<TimeDelta> for PDuration {
    fn from(delta: TimeDelta) -> Self {
        Self(delta)
    }
}

impl fmt::Display for PDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.humanize())
    }
}

/// Position of a certificate in the chain of trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertRole {
    Leaf,
    Intermediate,
    Root,
}

impl CertRole {
    fn of(cert: &CertificateInfo) -> Self {
        if !cert.is_ca {
            CertRole::Leaf
        } else if cert.is_self_issued() {
            CertRole::Root
        } else {
            CertRole::Intermediate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CertRole::Leaf => "Leaf",
            CertRole::Intermediate => "Intermediate",
            CertRole::Root => "Root",
        }
    }
}

/// Validity facts for one certificate of a verified chain.
#[derive(Debug, Clone)]
pub struct TlsLink {
    pub cert: CertificateInfo,
    pub issued: DateTime<Utc>,
    /// Time until not-after.
    pub remaining_validity: PDuration,
    /// not-after minus not-before.
    pub total_validity: PDuration,
    /// Time until not-before plus the browser maximum lifetime.
    pub browser_validity: PDuration,
    pub role: CertRole,
    pub earliest_expiry: bool,
}

impl TlsLink {
    fn new(cert: &CertificateInfo, now: DateTime<Utc>) -> Self {
        let browser_expiry = cert.not_before + TimeDelta::days(BROWSER_MAX_VALIDITY_DAYS);
        Self {
            cert: cert.clone(),
            issued: cert.not_before,
            remaining_validity: PDuration(cert.not_after - now),
            total_validity: PDuration(cert.not_after - cert.not_before),
            browser_validity: PDuration(browser_expiry - now),
            role: CertRole::of(cert),
            earliest_expiry: false,
        }
    }

    pub fn browser_expiry() -> PDuration {
        PDuration::days(BROWSER_MAX_VALIDITY_DAYS)
    }

    fn print_remaining_validity(&self) -> String {
        let rv = self.remaining_validity.humanize();
        if self.earliest_expiry {
            format!("{}, which is the earliest in your chain", rv)
        } else {
            rv
        }
    }
}

/// Analyse a verified chain against the current time.
pub fn analyze(chain: &VerifiedChain) -> Vec<TlsLink> {
    analyze_at(chain, Utc::now())
}

/// Analyse a verified chain as of `now`.
pub fn analyze_at(chain: &VerifiedChain, now: DateTime<Utc>) -> Vec<TlsLink> {
    let mut links: Vec<TlsLink> = chain
        .certs()
        .iter()
        .map(|cert| TlsLink::new(cert, now))
        .collect();

    let mut earliest: Option<(usize, PDuration)> = None;
    for (i, link) in links.iter().enumerate() {
        match earliest {
            Some((_, min)) if link.remaining_validity >= min => {}
            _ => earliest = Some((i, link.remaining_validity)),
        }
    }
    if let Some((i, _)) = earliest {
        links[i].earliest_expiry = true;
    }
    links
}

/// Log level a chain report is emitted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Warn,
}

/// Composite, human readable description of an analysed chain.
#[derive(Debug, Clone)]
pub struct ChainReport {
    links: Vec<TlsLink>,
    message: String,
    severity: Severity,
}

impl ChainReport {
    pub fn new(links: Vec<TlsLink>) -> Self {
        let message = describe(&links);
        let severity = match links.iter().find(|l| l.earliest_expiry) {
            Some(link) if link.remaining_validity < PDuration::days(WARN_THRESHOLD_DAYS) => {
                Severity::Warn
            }
            _ => Severity::Debug,
        };
        Self {
            links,
            message,
            severity,
        }
    }

    pub fn links(&self) -> &[TlsLink] {
        &self.links
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn earliest(&self) -> Option<&TlsLink> {
        self.links.iter().find(|l| l.earliest_expiry)
    }

    /// Emit the summary once, at the report's severity.
    pub fn log(&self) {
        let Some(earliest) = self.earliest() else {
            return;
        };
        let remaining_days = earliest.remaining_validity.as_days();
        match self.severity {
            Severity::Warn => tracing::warn!(remaining_days, "{}", self.message),
            Severity::Debug => tracing::debug!(remaining_days, "{}", self.message),
        }
    }
}

fn describe(links: &[TlsLink]) -> String {
    let n = links.len();
    let mut sb = format!("Snapshot of your cert chain size {} explained. ", n);

    for (i, link) in links.iter().enumerate() {
        let cert = &link.cert;
        if link.role == CertRole::Leaf {
            sb.push_str(&format!(
                "[{}/{}] TLS cert serial #{}, sha1 fingerprint #{} for DNS names [{}], \
                 valid from {}, signed by [{}], expires in {}. ",
                i + 1,
                n,
                format_serial(&cert.serial),
                sha1_fingerprint(cert.der.as_ref()),
                cert.dns_names.join(", "),
                link.issued.format("%Y-%m-%d"),
                cert.issuer,
                link.print_remaining_validity(),
            ));
            if link.total_validity > TlsLink::browser_expiry() {
                sb.push_str(&format!(
                    "Total validity period of {} days is above legal browser maximum of {} days. ",
                    link.total_validity.as_days(),
                    BROWSER_MAX_VALIDITY_DAYS,
                ));
            }
            if link.browser_validity.is_negative() {
                sb.push_str(&format!(
                    "Validity grace period expired {} ago, \
                     update this certificate now to avoid disruption. ",
                    link.browser_validity.abs(),
                ));
            } else if link.browser_validity < link.remaining_validity {
                sb.push_str(&format!(
                    "You may experience disruption in {}. ",
                    link.browser_validity,
                ));
            }
        } else {
            sb.push_str(&format!(
                "[{}/{}] {} CA #{} Common name [{}], signed by [{}], expires in {}. ",
                i + 1,
                n,
                link.role.as_str(),
                format_serial(&cert.serial),
                cert.subject,
                cert.issuer,
                link.remaining_validity,
            ));
        }
    }
    sb
}
