//! File watcher for hot reload of configuration and TLS material.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// A change observed on disk.
#[derive(Debug, Clone)]
pub enum ReloadEvent {
    /// The config file changed and the new content validated.
    Config(Box<ProxyConfig>),
    /// A watched certificate or key file changed.
    TlsMaterial,
}

/// A watcher that monitors the configuration file and TLS files for changes.
pub struct ConfigWatcher {
    config_path: PathBuf,
    tls_paths: Vec<PathBuf>,
    update_tx: mpsc::UnboundedSender<ReloadEvent>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for reload events.
    pub fn new(config_path: &Path) -> (Self, mpsc::UnboundedReceiver<ReloadEvent>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                config_path: config_path.to_path_buf(),
                tls_paths: Vec::new(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Also watch certificate and key files referenced by path.
    pub fn with_tls_paths(mut self, config: &ProxyConfig) -> Self {
        self.tls_paths = tls_paths_of(config);
        self
    }

    /// Start watching the files in a background thread.
    ///
    /// Any event outside the config file is reported as `TlsMaterial`.
    pub fn run(self) -> Result<WatchHandle, notify::Error> {
        let tx = self.update_tx.clone();
        let config_path = self.config_path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    if !event.paths.iter().any(|p| p.ends_with(&config_path)) {
                        tracing::info!(paths = ?event.paths, "TLS material change detected");
                        let _ = tx.send(ReloadEvent::TlsMaterial);
                        return;
                    }
                    tracing::info!("Config file change detected, reloading...");
                    match load_config(&config_path) {
                        Ok(new_config) => {
                            let _ = tx.send(ReloadEvent::Config(Box::new(new_config)));
                        }
                        Err(e) => {
                            tracing::error!(
                                "Failed to reload config: {}. Keeping current configuration.",
                                e
                            );
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.config_path, RecursiveMode::NonRecursive)?;
        for path in &self.tls_paths {
            watcher.watch(path, RecursiveMode::NonRecursive)?;
        }

        tracing::info!(
            path = ?self.config_path,
            tls_files = self.tls_paths.len(),
            "Config watcher started"
        );
        Ok(WatchHandle {
            watcher,
            tls_paths: self.tls_paths,
        })
    }
}

/// A running watcher. Dropping it stops all watches.
pub struct WatchHandle {
    watcher: RecommendedWatcher,
    tls_paths: Vec<PathBuf>,
}

impl WatchHandle {
    /// Certificate and key files currently watched.
    pub fn tls_paths(&self) -> &[PathBuf] {
        &self.tls_paths
    }

    /// Follow `cert_path`/`key_path` of a reloaded config.
    pub fn update_tls_paths(&mut self, config: &ProxyConfig) -> Result<(), notify::Error> {
        let next = tls_paths_of(config);
        if next == self.tls_paths {
            return Ok(());
        }

        for path in self.tls_paths.iter().filter(|p| !next.contains(p)) {
            if let Err(e) = self.watcher.unwatch(path) {
                tracing::debug!(path = ?path, error = %e, "TLS file was not watched");
            }
        }
        for path in next.iter().filter(|p| !self.tls_paths.contains(p)) {
            self.watcher.watch(path, RecursiveMode::NonRecursive)?;
        }

        tracing::info!(tls_files = ?next, "TLS file watches updated");
        self.tls_paths = next;
        Ok(())
    }
}

fn tls_paths_of(config: &ProxyConfig) -> Vec<PathBuf> {
    config
        .listener
        .tls
        .as_ref()
        .map(|tls| {
            [&tls.cert_path, &tls.key_path]
                .into_iter()
                .flatten()
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;
    use tempfile::TempDir;

    fn config_with_files(dir: &TempDir, cert: &str, key: &str) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.listener.tls = Some(TlsConfig {
            cert_path: Some(dir.path().join(cert).display().to_string()),
            key_path: Some(dir.path().join(key).display().to_string()),
            ..Default::default()
        });
        config
    }

    fn touch(dir: &TempDir, names: &[&str]) {
        for name in names {
            std::fs::write(dir.path().join(name), "placeholder").unwrap();
        }
    }

    #[tokio::test]
    async fn reloaded_config_moves_tls_watches() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir, &["proxy.toml", "a.pem", "a.key", "b.pem", "b.key"]);
        let first = config_with_files(&dir, "a.pem", "a.key");
        let second = config_with_files(&dir, "b.pem", "b.key");

        let (watcher, _rx) = ConfigWatcher::new(&dir.path().join("proxy.toml"));
        let mut handle = watcher.with_tls_paths(&first).run().unwrap();
        assert_eq!(handle.tls_paths(), tls_paths_of(&first).as_slice());

        handle.update_tls_paths(&second).unwrap();
        assert_eq!(
            handle.tls_paths(),
            [dir.path().join("b.pem"), dir.path().join("b.key")].as_slice()
        );
    }

    #[tokio::test]
    async fn change_to_newly_watched_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir, &["proxy.toml", "a.pem", "a.key", "b.pem", "b.key"]);

        let (watcher, mut rx) = ConfigWatcher::new(&dir.path().join("proxy.toml"));
        let mut handle = watcher
            .with_tls_paths(&config_with_files(&dir, "a.pem", "a.key"))
            .run()
            .unwrap();
        handle
            .update_tls_paths(&config_with_files(&dir, "b.pem", "b.key"))
            .unwrap();

        std::fs::write(dir.path().join("b.pem"), "rotated").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event for the new certificate file");
        assert!(matches!(event, Some(ReloadEvent::TlsMaterial)));
    }

    #[test]
    fn inline_material_has_no_paths() {
        let mut config = ProxyConfig::default();
        config.listener.tls = Some(TlsConfig {
            cert: Some("pem".into()),
            key: Some("pem".into()),
            ..Default::default()
        });
        assert!(tls_paths_of(&config).is_empty());
    }
}
