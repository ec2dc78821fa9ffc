//! Config file watcher for live retargeting.
//!
//! Only `proxy.target` is applied at runtime. The watcher remembers the last
//! target it read from the file and forwards a new one only when that value
//! changes, so edits to unrelated settings (or a plain re-save) never undo a
//! retarget made from the dashboard or the command line.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, parse_config, ConfigError};
use crate::proxy::Target;

/// The target as last seen in the config file.
#[derive(Debug)]
pub struct FileTarget {
    path: PathBuf,
    last: Mutex<Option<Target>>,
}

impl FileTarget {
    /// Track `path`, seeding the baseline from its current contents.
    pub fn new(path: &Path) -> Self {
        let last = match load_config(path) {
            Ok(config) => Some(config.proxy.target),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Config file unreadable, no baseline target");
                None
            }
        };
        Self {
            path: path.to_path_buf(),
            last: Mutex::new(last),
        }
    }

    /// The baseline target, if the file has been read successfully.
    pub fn last(&self) -> Option<Target> {
        self.last.lock().expect("file target mutex poisoned").clone()
    }

    /// Re-read the file. Returns the new target only when the file's target
    /// differs from the previous read.
    ///
    /// An empty file is treated as a write in progress and skipped.
    pub fn reload(&self) -> Result<Option<Target>, ConfigError> {
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = ?self.path, "Config file empty, waiting for the write to finish");
            return Ok(None);
        }

        let target = parse_config(&content)?.proxy.target;
        let mut last = self.last.lock().expect("file target mutex poisoned");
        if last.as_ref() == Some(&target) {
            return Ok(None);
        }
        *last = Some(target.clone());
        Ok(Some(target))
    }
}

/// Watches the config file and sends changed targets over a channel.
pub struct ConfigWatcher {
    file: Arc<FileTarget>,
    update_tx: mpsc::UnboundedSender<Target>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`.
    ///
    /// Returns the watcher and a receiver for target changes.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<Target>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                file: Arc::new(FileTarget::new(path)),
                update_tx,
            },
            update_rx,
        )
    }

    pub fn file(&self) -> &FileTarget {
        &self.file
    }

    /// Start watching in a background thread.
    ///
    /// The returned handle must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let file = self.file.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    match file.reload() {
                        Ok(Some(target)) => {
                            tracing::info!(target_addr = %target, "Config file target changed");
                            let _ = tx.send(target);
                        }
                        Ok(None) => {
                            tracing::debug!("Config file changed, target unchanged");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config, keeping current target");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.file.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.file.path, "Config watcher started");
        Ok(watcher)
    }
}
