//! Symlink overlay setup
//!
//! Replaces each profile item under the session home with a symbolic link
//! into the durable-storage mirror directory. Whatever the container image
//! shipped at those paths is discarded, not merged: after setup the home
//! side of every item is a link, never a plain file or directory.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs as unix_fs;
use std::path::Path;

use log::{info, warn};

use crate::error::Result;
use crate::profile::{PersistenceItem, PersistenceProfile};

/// Result of an overlay pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayOutcome {
    pub linked: usize,
    pub failed: usize,
}

/// Link every item of `profile` from `home` into `mirror`.
///
/// Linking is best-effort per item: a failure (bad permissions, a file
/// blocking a parent directory) is logged and the remaining items are
/// still processed. Only a mirror root that cannot be created fails the
/// whole pass. Running setup twice yields the same end state.
pub fn setup_overlay(
    profile: &PersistenceProfile,
    home: &Path,
    mirror: &Path,
) -> Result<OverlayOutcome> {
    info!(
        "Linking persistent configuration files ({} profile)...",
        profile.name
    );
    fs::create_dir_all(mirror)?;

    let mut outcome = OverlayOutcome {
        linked: 0,
        failed: 0,
    };

    for item in &profile.items {
        match link_item(item, home, mirror) {
            Ok(()) => {
                outcome.linked += 1;
                info!(
                    "  - Linked {} -> {}",
                    home.join(item.rel_path).display(),
                    mirror.join(item.rel_path).display()
                );
            }
            Err(e) => {
                outcome.failed += 1;
                warn!("Could not persist {}: {}", item.rel_path, e);
            }
        }
    }

    info!(
        "...done linking files ({} linked, {} failed).",
        outcome.linked, outcome.failed
    );
    Ok(outcome)
}

fn link_item(item: &PersistenceItem, home: &Path, mirror: &Path) -> Result<()> {
    let mirror_path = mirror.join(item.rel_path);
    let home_path = home.join(item.rel_path);

    // Parents on the mirror side, plus the mirror directory itself for
    // directory items so linked tools see a valid target right away.
    if let Some(parent) = mirror_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if item.dir {
        fs::create_dir_all(&mirror_path)?;
    }

    if let Some(parent) = home_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Remove whatever currently occupies the home-side path. Template
    // content written before this point is deliberately discarded.
    match fs::symlink_metadata(&home_path) {
        Ok(meta) => {
            if meta.file_type().is_symlink() || !meta.is_dir() {
                fs::remove_file(&home_path)?;
            } else {
                fs::remove_dir_all(&home_path)?;
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    unix_fs::symlink(&mirror_path, &home_path)?;
    Ok(())
}
