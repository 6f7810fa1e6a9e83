//! Recurring TLS certificate health check.
//!
//! # Responsibilities
//! - Verify and analyse the active certificate chain on a schedule
//! - Log the chain report at the severity it asks for
//! - Survive any failure inside a cycle
//!
//! # Design Decisions
//! - Errors and panics are caught per cycle and logged at trace
//! - A cycle without an active certificate is skipped, not fatal

use rustls::pki_types::CertificateDer;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;
use crate::tls::{self, ChainReport, ReloadableCert, TlsError};

/// Verification and analysis applied to the active chain each cycle.
type Inspection = fn(&[CertificateDer<'_>]) -> Result<ChainReport, TlsError>;

/// How long the monitor keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorMode {
    /// Check, then sleep for the interval, forever.
    Continuous,
    /// Check exactly once. Used for startup diagnostics.
    OneShot,
}

pub struct TlsHealthMonitor {
    certificate: Arc<ReloadableCert>,
    interval: Duration,
    inspect: Inspection,
}

impl TlsHealthMonitor {
    pub fn new(certificate: Arc<ReloadableCert>, interval: Duration) -> Self {
        Self {
            certificate,
            interval,
            inspect: tls::inspect,
        }
    }

    #[cfg(test)]
    fn with_inspection(mut self, inspect: Inspection) -> Self {
        self.inspect = inspect;
        self
    }

    /// Run cycles in the given mode.
    ///
    /// `OneShot` returns the report of its single cycle; `Continuous` never
    /// returns.
    pub async fn run(self, mode: MonitorMode) -> Option<ChainReport> {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            mode = ?mode,
            "TLS certificate monitor starting"
        );

        loop {
            let report = self.check();
            match mode {
                MonitorMode::OneShot => return report,
                MonitorMode::Continuous => tokio::time::sleep(self.interval).await,
            }
        }
    }

    /// Run a single cycle. Returns the report when the chain verified.
    pub fn check(&self) -> Option<ChainReport> {
        let Some(active) = self.certificate.active() else {
            tracing::trace!("No active TLS certificate, skipping check");
            metrics::record_health_check("skipped");
            return None;
        };

        let inspect = self.inspect;
        match panic::catch_unwind(AssertUnwindSafe(|| inspect(active.chain()))) {
            Ok(Ok(report)) => {
                report.log();
                if let Some(earliest) = report.earliest() {
                    let remaining = earliest.remaining_validity.as_duration();
                    metrics::record_cert_expiry(remaining.num_seconds());
                }
                metrics::record_health_check("verified");
                Some(report)
            }
            Ok(Err(e)) => {
                tracing::trace!(error = %e, "TLS cert not analysed");
                metrics::record_health_check("invalid");
                None
            }
            Err(payload) => {
                let cause = panic_message(payload.as_ref());
                tracing::trace!(cause = %cause, "TLS cert not analysed");
                metrics::record_health_check("panic");
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static PANICKING_CYCLES: AtomicUsize = AtomicUsize::new(0);

    fn exploding(_: &[CertificateDer<'_>]) -> Result<ChainReport, TlsError> {
        panic!("inspection failed");
    }

    fn counted_exploding(_: &[CertificateDer<'_>]) -> Result<ChainReport, TlsError> {
        PANICKING_CYCLES.fetch_add(1, Ordering::SeqCst);
        panic!("inspection failed");
    }

    async fn active_certificate() -> Arc<ReloadableCert> {
        let generated = rcgen::generate_simple_self_signed(vec!["proxy.test".to_string()]).unwrap();
        let cert = Arc::new(ReloadableCert::new(Some(TlsConfig {
            cert: Some(generated.cert.pem()),
            key: Some(generated.key_pair.serialize_pem()),
            ..Default::default()
        })));
        cert.trigger_init().await.unwrap();
        cert
    }

    #[test]
    fn check_without_certificate_is_skipped() {
        let certificate = Arc::new(ReloadableCert::new(None));
        let monitor = TlsHealthMonitor::new(certificate, Duration::from_secs(1));
        assert!(monitor.check().is_none());
    }

    #[tokio::test]
    async fn one_shot_returns() {
        let certificate = Arc::new(ReloadableCert::new(None));
        let monitor = TlsHealthMonitor::new(certificate, Duration::from_secs(3600));
        let report = tokio::time::timeout(Duration::from_secs(1), monitor.run(MonitorMode::OneShot))
            .await
            .expect("one-shot monitor kept running");
        assert!(report.is_none());
    }

    #[tokio::test]
    async fn panicking_cycle_is_contained() {
        let monitor = TlsHealthMonitor::new(active_certificate().await, Duration::from_secs(1))
            .with_inspection(exploding);

        assert!(monitor.check().is_none());
    }

    #[tokio::test]
    async fn continuous_monitor_outlives_panics() {
        let monitor = TlsHealthMonitor::new(active_certificate().await, Duration::from_millis(5))
            .with_inspection(counted_exploding);

        let handle = tokio::spawn(monitor.run(MonitorMode::Continuous));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!handle.is_finished());
        assert!(PANICKING_CYCLES.load(Ordering::SeqCst) >= 2);
        handle.abort();
    }

    #[test]
    fn panic_message_reads_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
