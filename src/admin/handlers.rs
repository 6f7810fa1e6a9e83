use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::lifecycle::{LifecycleState, Runtime};
use crate::tls::{self, format, ChainReport, Severity, TlsLink};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub lifecycle: &'static str,
    pub initializing: bool,
    pub certificate: Option<CertificateStatus>,
}

#[derive(Serialize)]
pub struct CertificateStatus {
    pub serial: String,
    pub subject: String,
    pub issuer: String,
    pub dns_names: Vec<String>,
    pub not_after: String,
}

#[derive(Serialize)]
pub struct ChainView {
    pub severity: &'static str,
    pub summary: String,
    pub links: Vec<LinkView>,
}

#[derive(Serialize)]
pub struct LinkView {
    pub role: &'static str,
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub sha1: String,
    pub sha256: String,
    pub dns_names: Vec<String>,
    pub not_before: String,
    pub not_after: String,
    pub remaining_days: i64,
    pub total_days: i64,
    pub browser_days: i64,
    pub earliest_expiry: bool,
}

#[derive(Serialize)]
pub struct ReloadOutcome {
    pub status: &'static str,
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (status, Json(ErrorBody { error: error.to_string() }))
}

impl From<&TlsLink> for LinkView {
    fn from(link: &TlsLink) -> Self {
        let cert = &link.cert;
        Self {
            role: link.role.as_str(),
            subject: cert.subject.clone(),
            issuer: cert.issuer.clone(),
            serial: format::format_serial(&cert.serial),
            sha1: format::sha1_fingerprint(cert.der.as_ref()),
            sha256: format::sha256_fingerprint(cert.der.as_ref()),
            dns_names: cert.dns_names.clone(),
            not_before: cert.not_before.to_rfc3339(),
            not_after: cert.not_after.to_rfc3339(),
            remaining_days: link.remaining_validity.as_days(),
            total_days: link.total_validity.as_days(),
            browser_days: link.browser_validity.as_days(),
            earliest_expiry: link.earliest_expiry,
        }
    }
}

impl From<&ChainReport> for ChainView {
    fn from(report: &ChainReport) -> Self {
        Self {
            severity: match report.severity() {
                Severity::Warn => "warn",
                Severity::Debug => "debug",
            },
            summary: report.message().to_string(),
            links: report.links().iter().map(LinkView::from).collect(),
        }
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let certificate = state.runtime.certificate.active().map(|active| {
        let leaf = active.leaf();
        CertificateStatus {
            serial: active.serial().to_string(),
            subject: leaf.subject.clone(),
            issuer: leaf.issuer.clone(),
            dns_names: leaf.dns_names.clone(),
            not_after: leaf.not_after.to_rfc3339(),
        }
    });

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        lifecycle: state.runtime.lifecycle.current().as_str(),
        initializing: state.runtime.certificate.is_initializing(),
        certificate,
    })
}

/// Verify and analyse the active chain on demand.
pub async fn get_tls(State(state): State<AdminState>) -> Result<Json<ChainView>, ApiError> {
    let active = state
        .runtime
        .certificate
        .active()
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "no active certificate"))?;

    let report = tls::inspect(active.chain())
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;
    Ok(Json(ChainView::from(&report)))
}

/// Administrative reload trigger.
pub async fn reload_tls(State(state): State<AdminState>) -> (StatusCode, Json<ReloadOutcome>) {
    let result = state.runtime.reload_certificate().await;
    let serial = state
        .runtime
        .certificate
        .active()
        .map(|active| active.serial().to_string());

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(ReloadOutcome {
                status: "reloaded",
                serial,
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ReloadOutcome {
                status: "failed",
                serial,
                error: Some(e.to_string()),
            }),
        ),
    }
}

pub async fn get_health(State(runtime): State<Runtime>) -> (StatusCode, &'static str) {
    match runtime.lifecycle.current() {
        LifecycleState::Daemon => (StatusCode::OK, "ok"),
        state => (StatusCode::SERVICE_UNAVAILABLE, state.as_str()),
    }
}
