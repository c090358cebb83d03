//! Directory snapshots on durable storage
//!
//! A snapshot is a single gzip-compressed tar archive holding a whole
//! directory tree. It is written at shutdown and consumed (extracted,
//! then left in place) at the next startup. The running container never
//! keeps a local copy across restarts; durable storage owns the file.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info};

use crate::error::{DevboxError, Result};

/// Filesystem-recovery directory never cleared nor archived.
pub const RECOVERY_DIR: &str = "lost+found";

/// A directory tree paired with its snapshot location.
#[derive(Debug, Clone)]
pub struct ArchiveTarget {
    /// Directory to archive/restore
    pub source: PathBuf,
    /// Snapshot file on durable storage
    pub archive: PathBuf,
}

impl ArchiveTarget {
    pub fn new(source: impl Into<PathBuf>, archive: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            archive: archive.into(),
        }
    }
}

/// Archive `source` into a gzip tar at `archive`, skipping top-level
/// entries named in `exclude`. Symbolic links are stored as links, never
/// followed. Returns the size of the written archive in bytes.
pub fn backup(source: &Path, archive: &Path, exclude: &[&str]) -> Result<u64> {
    if !source.is_dir() {
        return Err(DevboxError::Archive(format!(
            "backup source {} is not a directory",
            source.display()
        )));
    }
    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(archive)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let name = entry.file_name();
        if exclude.iter().any(|e| name.to_string_lossy() == *e) {
            debug!("Skipping excluded entry {:?}", name);
            continue;
        }

        let path = entry.path();
        let meta = fs::symlink_metadata(&path)?;
        if meta.is_dir() {
            builder.append_dir_all(&name, &path)?;
        } else {
            // Regular files and symlinks alike; follow_symlinks(false)
            // makes the builder store links as link entries.
            builder.append_path_with_name(&path, &name)?;
        }
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    let size = fs::metadata(archive)?.len();
    Ok(size)
}

/// Restore a snapshot over `target`, if one exists.
///
/// Returns `Ok(false)` when there is no snapshot at `archive` (the normal
/// first-run case). Otherwise the current contents of `target` are cleared
/// first, keeping only the entries named in `preserve`, and the archive is
/// extracted over the directory root.
pub fn restore(archive: &Path, target: &Path, preserve: &[&str]) -> Result<bool> {
    let file = match File::open(archive) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No snapshot at {}, starting fresh", archive.display());
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        "Restoring snapshot {} into {}",
        archive.display(),
        target.display()
    );
    fs::create_dir_all(target)?;
    clear_dir(target, preserve)?;

    let mut ar = tar::Archive::new(GzDecoder::new(file));
    ar.set_preserve_permissions(true);
    ar.unpack(target)
        .map_err(|e| DevboxError::Archive(format!("extracting {}: {}", archive.display(), e)))?;
    Ok(true)
}

/// Remove every entry of `dir` except the names in `preserve`.
fn clear_dir(dir: &Path, preserve: &[&str]) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if preserve.iter().any(|p| name.to_string_lossy() == *p) {
            continue;
        }
        let path = entry.path();
        let meta = fs::symlink_metadata(&path)?;
        if meta.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs as unix_fs;

    fn populate(root: &Path) {
        fs::create_dir_all(root.join("projects/demo")).unwrap();
        fs::write(root.join(".bashrc"), "alias ll='ls -l'").unwrap();
        fs::write(root.join("projects/demo/main.rs"), "fn main() {}").unwrap();
        unix_fs::symlink("/data/.config_persistence/.vimrc", root.join(".vimrc")).unwrap();
    }

    #[test]
    fn test_round_trip_reproduces_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("home");
        let target = tmp.path().join("restored");
        let archive = tmp.path().join("snap.tar.gz");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&target).unwrap();
        populate(&source);

        let size = backup(&source, &archive, &[]).unwrap();
        assert!(size > 0);
        assert!(restore(&archive, &target, &[]).unwrap());

        assert_eq!(
            fs::read(target.join(".bashrc")).unwrap(),
            fs::read(source.join(".bashrc")).unwrap()
        );
        assert_eq!(
            fs::read(target.join("projects/demo/main.rs")).unwrap(),
            fs::read(source.join("projects/demo/main.rs")).unwrap()
        );
        // Symlinks come back as symlinks with the original target
        let link = target.join(".vimrc");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_link(&link).unwrap(),
            PathBuf::from("/data/.config_persistence/.vimrc")
        );
    }

    #[test]
    fn test_backup_excludes_recovery_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("home");
        let target = tmp.path().join("restored");
        let archive = tmp.path().join("snap.tar.gz");
        fs::create_dir_all(source.join(RECOVERY_DIR)).unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::write(source.join(RECOVERY_DIR).join("fsck0"), "junk").unwrap();
        fs::write(source.join("keep.txt"), "keep").unwrap();

        backup(&source, &archive, &[RECOVERY_DIR]).unwrap();
        restore(&archive, &target, &[]).unwrap();

        assert!(target.join("keep.txt").exists());
        assert!(!target.join(RECOVERY_DIR).exists());
    }

    #[test]
    fn test_restore_clears_target_except_preserved() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("home");
        let target = tmp.path().join("box");
        let archive = tmp.path().join("snap.tar.gz");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("session.txt"), "from archive").unwrap();

        fs::create_dir_all(target.join(RECOVERY_DIR)).unwrap();
        fs::write(target.join("stale.txt"), "image default").unwrap();
        fs::write(target.join(RECOVERY_DIR).join("orphan"), "kept").unwrap();

        backup(&source, &archive, &[]).unwrap();
        restore(&archive, &target, &[RECOVERY_DIR]).unwrap();

        assert!(!target.join("stale.txt").exists());
        assert!(target.join("session.txt").exists());
        assert!(target.join(RECOVERY_DIR).join("orphan").exists());
    }

    #[test]
    fn test_restore_without_snapshot_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("box");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("default.txt"), "image default").unwrap();

        let restored = restore(&tmp.path().join("missing.tar.gz"), &target, &[]).unwrap();
        assert!(!restored);
        // Target untouched when there is nothing to restore
        assert!(target.join("default.txt").exists());
    }

    #[test]
    fn test_backup_rejects_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let err = backup(
            &tmp.path().join("nope"),
            &tmp.path().join("snap.tar.gz"),
            &[],
        );
        assert!(err.is_err());
    }
}
