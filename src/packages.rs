//! Extra package installation
//!
//! Unlike persistence and backup, a failed install is fatal to the
//! request: the user explicitly asked for these tools, so a session
//! without them is wrong, not merely degraded.

use std::process::Command;

use log::info;

use crate::error::{DevboxError, Result};

/// Install `packages` with apt. No-op on an empty list.
pub fn install_packages(packages: &[String]) -> Result<()> {
    if packages.is_empty() {
        return Ok(());
    }

    info!("Installing extra packages: {}...", packages.join(", "));

    run_apt(&["update"])?;

    let mut args: Vec<&str> = vec!["install", "-y"];
    args.extend(packages.iter().map(String::as_str));
    run_apt(&args)?;

    info!("Extra packages installed.");
    Ok(())
}

/// Debian ships `python3`; a bare `python` request would fail the whole
/// install, so it is rewritten to the compatibility package.
pub fn normalize_package_names(packages: Vec<String>) -> Vec<String> {
    packages
        .into_iter()
        .map(|p| {
            if p == "python" {
                info!("Replaced 'python' with 'python-is-python3' for Debian compatibility");
                "python-is-python3".to_string()
            } else {
                p
            }
        })
        .collect()
}

fn run_apt(args: &[&str]) -> Result<()> {
    let status = Command::new("apt-get")
        .args(args)
        .status()
        .map_err(|e| DevboxError::PackageInstall(format!("apt-get {}: {}", args[0], e)))?;

    if !status.success() {
        return Err(DevboxError::PackageInstall(format!(
            "apt-get {} exited with {}",
            args[0], status
        )));
    }
    Ok(())
}
