// ── Persisted integration state ──
//
// Small JSON document at `{state_dir}/fbxhome_config.json`, shaped
// `{ "version": 1, "data": { ... } }`. Loaded once on startup (a missing
// file means first run), saved on shutdown and before a reboot. Writes go
// through a temp file and a rename so a crash never leaves a torn file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CoreError;

pub const STORAGE_VERSION: u32 = 1;
pub const STORAGE_FILE: &str = "fbxhome_config.json";

/// User options that outlive a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedConfig {
    /// Shutter node ids whose reported position is inverted.
    #[serde(default)]
    pub inverted_shutters: BTreeSet<u64>,
    /// Keys written by other tools are kept as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredFile {
    version: u32,
    data: PersistedConfig,
}

/// In-memory copy plus its on-disk location.
pub struct ConfigStore {
    path: PathBuf,
    data: ArcSwap<PersistedConfig>,
}

impl ConfigStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(STORAGE_FILE),
            data: ArcSwap::from_pointee(PersistedConfig::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents (cheap `Arc` clone).
    pub fn current(&self) -> Arc<PersistedConfig> {
        self.data.load_full()
    }

    /// Apply an in-memory change. Persisted by the next `save()`.
    pub fn update(&self, f: impl Fn(&mut PersistedConfig)) {
        self.data.rcu(|current| {
            let mut next = PersistedConfig::clone(current);
            f(&mut next);
            next
        });
    }

    /// Load from disk. Returns `false` when no file exists yet (the
    /// in-memory copy is reset to empty).
    pub async fn load(&self) -> Result<bool, CoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no stored configuration, starting fresh");
                self.data.store(Arc::new(PersistedConfig::default()));
                return Ok(false);
            }
            Err(e) => return Err(self.storage_error(&e)),
        };

        let stored: StoredFile = serde_json::from_slice(&raw).map_err(|e| self.storage_error(&e))?;
        if stored.version > STORAGE_VERSION {
            return Err(CoreError::Storage {
                path: self.path.clone(),
                message: format!(
                    "written by a newer version (format {}, supported {STORAGE_VERSION})",
                    stored.version
                ),
            });
        }
        debug!(path = %self.path.display(), "loaded stored configuration");
        self.data.store(Arc::new(stored.data));
        Ok(true)
    }

    /// Write the current contents atomically.
    pub async fn save(&self) -> Result<(), CoreError> {
        let file = StoredFile {
            version: STORAGE_VERSION,
            data: PersistedConfig::clone(&self.data.load()),
        };
        let body = serde_json::to_vec_pretty(&file).map_err(|e| self.storage_error(&e))?;

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.storage_error(&e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| self.storage_error(&e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.storage_error(&e))?;

        info!(path = %self.path.display(), "saved configuration");
        Ok(())
    }

    fn storage_error(&self, err: &dyn std::fmt::Display) -> CoreError {
        CoreError::Storage {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }
}
