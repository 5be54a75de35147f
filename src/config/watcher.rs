//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::ServiceConfig;

/// Watches the config file and pushes every valid new version downstream.
///
/// The parent directory is watched rather than the file itself, so editors
/// that save by writing a temp file and renaming it are still picked up.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ServiceConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ServiceConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Dropping the returned handle stops the watch.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let last_seen = Mutex::new(std::fs::read_to_string(&path).ok());
        let tx = self.update_tx;
        let target = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_target = event.paths.iter().any(|p| p.file_name() == target.file_name());
                    if !touches_target || !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    let content = match std::fs::read_to_string(&target) {
                        Ok(c) => c,
                        Err(e) => {
                            tracing::warn!(path = ?target, error = %e, "Config file unreadable during reload");
                            return;
                        }
                    };
                    if let Ok(mut last) = last_seen.lock() {
                        if last.as_deref() == Some(content.as_str()) {
                            return;
                        }
                        *last = Some(content.clone());
                    }
                    match reload(&content) {
                        Some(config) => {
                            let _ = tx.send(config);
                        }
                        None => tracing::error!(path = ?target, "Keeping current configuration"),
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

fn reload(content: &str) -> Option<ServiceConfig> {
    match parse_config(content) {
        Ok(config) => {
            tracing::info!("Config reloaded");
            Some(config)
        }
        Err(e) => {
            tracing::error!(error = %e, "Rejected reloaded config");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_rejects_invalid() {
        assert!(reload("[gateway]\nlisten_port = 0\n").is_none());
        let config = reload("[gateway]\npublic_address = \"gw2\"\n").unwrap();
        assert_eq!(config.gateway.public_address, "gw2");
    }
}
