//! Session configuration
//!
//! All tunables that were process-wide constants in earlier launcher
//! generations live in an explicit `SessionConfig` passed to the
//! `SessionController` at construction, so tests can inject arbitrary
//! timeout/interval/path combinations.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DevboxError, Result};

/// Environment variable carrying the SSH public key by default.
pub const DEFAULT_PUBKEY_VAR: &str = "PUBKEY";

/// Runtime configuration for one container session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Home directory of the session user (the overlay's link side)
    pub home_dir: PathBuf,

    /// Durable storage mount (outlives the container)
    pub storage_dir: PathBuf,

    /// Mirror directory backing the persistence symlinks
    pub mirror_dir: PathBuf,

    /// Well-known path of the home-directory archive snapshot
    pub archive_path: PathBuf,

    /// Shut down after this many seconds without an attached session
    pub idle_timeout_secs: u64,

    /// Poll period of the idle monitor
    pub check_interval_secs: u64,

    /// Environment variable holding the public key
    pub pubkey_var: String,

    /// Extra apt packages requested for this session
    pub extra_packages: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            home_dir: PathBuf::from("/root"),
            storage_dir: PathBuf::from("/data"),
            mirror_dir: PathBuf::from("/data/.config_persistence"),
            archive_path: PathBuf::from("/data/root_full_backup.tar.gz"),
            idle_timeout_secs: 300,
            check_interval_secs: 15,
            pubkey_var: DEFAULT_PUBKEY_VAR.to_string(),
            extra_packages: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a JSON file. Missing fields fall back
    /// to the defaults above.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| DevboxError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// SSH directory under the session home.
    pub fn ssh_dir(&self) -> PathBuf {
        self.home_dir.join(".ssh")
    }
}
