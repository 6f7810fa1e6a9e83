//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - SIGHUP reloads the TLS certificate
//! - SIGTERM/SIGINT move the lifecycle to Shutdown
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A failed reload never stops the signal loop

use crate::lifecycle::startup::Runtime;
use crate::lifecycle::state::LifecycleState;

/// Handle signals until a termination request arrives.
#[cfg(unix)]
pub async fn listen(runtime: Runtime) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                tracing::info!("SIGHUP received, reloading TLS certificate");
                let _ = runtime.reload_certificate().await;
            }
            _ = terminate.recv() => {
                tracing::info!("SIGTERM received");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received");
                break;
            }
        }
    }

    runtime.lifecycle.set_state(LifecycleState::Shutdown);
    Ok(())
}

/// Handle Ctrl+C until a termination request arrives.
#[cfg(not(unix))]
pub async fn listen(runtime: Runtime) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    runtime.lifecycle.set_state(LifecycleState::Shutdown);
    Ok(())
}
