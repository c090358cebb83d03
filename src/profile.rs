//! Persistence profiles
//!
//! A `PersistenceProfile` is the curated list of home-directory paths that
//! must survive container restarts. Profiles are selected once at startup
//! via the closed `SessionFlavor` enum and never change for the lifetime of
//! the container.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::DevboxError;

/// Container flavor: which remote-access service and persistence set to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionFlavor {
    /// Terminal-access session (sshd)
    Ssh,
    /// Desktop-access session (xrdp + XFCE)
    Rdp,
    /// Long-running inference workload (sshd + model storage)
    Inference,
}

impl FromStr for SessionFlavor {
    type Err = DevboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ssh" => Ok(SessionFlavor::Ssh),
            "rdp" => Ok(SessionFlavor::Rdp),
            "inference" | "llm" => Ok(SessionFlavor::Inference),
            _ => Err(DevboxError::InvalidFlavor(s.to_string())),
        }
    }
}

impl fmt::Display for SessionFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionFlavor::Ssh => write!(f, "ssh"),
            SessionFlavor::Rdp => write!(f, "rdp"),
            SessionFlavor::Inference => write!(f, "inference"),
        }
    }
}

/// One home-directory path backed by durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersistenceItem {
    /// Path relative to the session home
    pub rel_path: &'static str,
    /// Whether the item is a directory (the mirror side is pre-created
    /// for directories so linked tools find a valid target immediately)
    pub dir: bool,
}

const fn file(rel_path: &'static str) -> PersistenceItem {
    PersistenceItem {
        rel_path,
        dir: false,
    }
}

const fn dir(rel_path: &'static str) -> PersistenceItem {
    PersistenceItem {
        rel_path,
        dir: true,
    }
}

/// Dotfiles every flavor persists.
const BASE_ITEMS: &[PersistenceItem] = &[
    file(".bash_history"),
    file(".bashrc"),
    file(".profile"),
    file(".viminfo"),
    file(".vimrc"),
    file(".gitconfig"),
    file(".ssh/config"),
    file(".ssh/known_hosts"),
];

/// Desktop-environment state on top of the base set.
const RDP_EXTRA_ITEMS: &[PersistenceItem] = &[
    dir(".config/xfce4"),
    dir(".local/share/xfce4"),
    dir(".cache/sessions"),
    dir("Desktop"),
    file(".xsession"),
];

/// Inference-workload state on top of the base set.
const INFERENCE_EXTRA_ITEMS: &[PersistenceItem] = &[dir(".config/llm"), dir(".models")];

/// Named, ordered set of persistence items for one flavor.
#[derive(Debug, Clone, Serialize)]
pub struct PersistenceProfile {
    pub name: String,
    pub items: Vec<PersistenceItem>,
}

impl PersistenceProfile {
    /// Build the standard profile for a flavor.
    pub fn for_flavor(flavor: SessionFlavor) -> Self {
        let extra: &[PersistenceItem] = match flavor {
            SessionFlavor::Ssh => &[],
            SessionFlavor::Rdp => RDP_EXTRA_ITEMS,
            SessionFlavor::Inference => INFERENCE_EXTRA_ITEMS,
        };

        let mut items = BASE_ITEMS.to_vec();
        items.extend_from_slice(extra);

        Self {
            name: flavor.to_string(),
            items,
        }
    }
}
