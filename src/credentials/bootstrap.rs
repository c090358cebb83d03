//! Authorized-key injection
//!
//! Writes the session's public key into `authorized_keys`, idempotently
//! and with verified permissions. Credential failures are the leading
//! cause of unreachable sessions, so this module logs enough detail to
//! diagnose one from the operator stream alone.

use std::env;
use std::fs::{self, OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use log::{error, info, warn};

use crate::error::{DevboxError, Result};

/// Minimum mask sshd accepts for the key file.
pub const AUTHORIZED_KEYS_MODE: u32 = 0o600;

/// Required mask for the `.ssh` directory.
pub const SSH_DIR_MODE: u32 = 0o700;

/// Outcome of a bootstrap pass.
#[derive(Debug, Clone, Copy)]
pub struct CredentialReport {
    /// Length of the installed key string
    pub key_len: usize,
    /// Whether the key was appended (false: already present)
    pub appended: bool,
    /// Final mask of the key file
    pub mode: u32,
}

/// Read the public key from the environment variable `var` and install it
/// under `ssh_dir`. An absent or empty variable is a hard failure: the
/// session would be unreachable without a key.
pub fn bootstrap_from_env(var: &str, ssh_dir: &Path) -> Result<CredentialReport> {
    let key = env::var(var).unwrap_or_default();
    let key = key.trim();

    if key.is_empty() {
        error!("CRITICAL: {} environment variable is empty or not set", var);
        error!("SSH authentication WILL FAIL for this session");
        return Err(DevboxError::Credential(format!(
            "{} is empty or not set",
            var
        )));
    }

    install_key(key, ssh_dir)
}

/// Install `key` into `<ssh_dir>/authorized_keys`.
///
/// Idempotent: a key already present in the file is never appended again.
/// The directory and file masks are enforced after every write and the
/// final content is re-read to verify the key landed.
pub fn install_key(key: &str, ssh_dir: &Path) -> Result<CredentialReport> {
    let uid = unsafe { libc::getuid() };
    let gid = unsafe { libc::getgid() };
    info!("SSH key bootstrap (uid={}, gid={})", uid, gid);
    info!(
        "Found public key: {}... (length: {})",
        key.chars().take(24).collect::<String>(),
        key.len()
    );

    fs::create_dir_all(ssh_dir)?;
    fs::set_permissions(ssh_dir, Permissions::from_mode(SSH_DIR_MODE))?;

    let keys_file = ssh_dir.join("authorized_keys");
    let existing = fs::read_to_string(&keys_file).unwrap_or_default();

    let appended = if existing.contains(key) {
        info!("Key already present in {}", keys_file.display());
        false
    } else {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&keys_file)?;
        writeln!(file, "{}", key)?;
        info!("Key appended to {}", keys_file.display());
        true
    };

    fs::set_permissions(&keys_file, Permissions::from_mode(AUTHORIZED_KEYS_MODE))?;

    // Verify: the file must contain the key, and the mask must not have
    // drifted. A drifted mask is a warning, not a failure.
    let written = fs::read_to_string(&keys_file)?;
    if !written.contains(key) {
        return Err(DevboxError::Credential(format!(
            "verification failed: key missing from {}",
            keys_file.display()
        )));
    }

    let mode = fs::metadata(&keys_file)?.permissions().mode() & 0o777;
    if mode != AUTHORIZED_KEYS_MODE {
        warn!(
            "{} mask is {:o}, expected {:o}",
            keys_file.display(),
            mode,
            AUTHORIZED_KEYS_MODE
        );
    } else {
        info!("Key installation verified (mask {:o})", mode);
    }

    Ok(CredentialReport {
        key_len: key.len(),
        appended,
        mode,
    })
}
