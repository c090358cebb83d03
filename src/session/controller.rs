//! Session controller
//!
//! Composes restore, overlay, credentials, packages, service launch and
//! the idle monitor into one ordered startup sequence plus an explicit
//! shutdown. The order is a strict total order: restore must precede the
//! overlay (overlay setup deletes whatever sits at each item's path, and
//! a later restore would clobber the fresh links with plain-file copies),
//! and the credential bootstrap must follow restore (the archive may
//! carry a stale key file).

use std::process::{Child, Command, Stdio};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bytesize::ByteSize;
use chrono::{DateTime, Local};
use log::{error, info, warn};

use crate::archive::{backup, restore, ArchiveTarget, RECOVERY_DIR};
use crate::config::SessionConfig;
use crate::credentials::bootstrap_from_env;
use crate::error::{DevboxError, Result};
use crate::monitor::{IdleMonitor, MonitorExit};
use crate::packages::install_packages;
use crate::persist::setup_overlay;
use crate::profile::{PersistenceProfile, SessionFlavor};
use crate::session::service::ServiceDescriptor;

/// Drives one container session from restore to final backup.
pub struct SessionController {
    config: SessionConfig,
    profile: PersistenceProfile,
    service: ServiceDescriptor,
    archives: Vec<ArchiveTarget>,
    started_at: DateTime<Local>,
    /// Set once the restore/overlay phase ran; shutdown only archives
    /// after this point so a failed early startup cannot overwrite a
    /// good snapshot with an empty home.
    armed: bool,
    backed_up: bool,
    reachable: bool,
    children: Vec<Child>,
}

impl SessionController {
    /// Standard controller for a flavor.
    pub fn for_flavor(flavor: SessionFlavor, config: SessionConfig) -> Self {
        let mut archives = vec![ArchiveTarget::new(&config.home_dir, &config.archive_path)];
        if flavor == SessionFlavor::Inference {
            // Model weights live outside the home directory and get their
            // own snapshot.
            archives.push(ArchiveTarget::new(
                "/opt/models",
                config.storage_dir.join("models_backup.tar.gz"),
            ));
        }

        Self::with_parts(
            config,
            PersistenceProfile::for_flavor(flavor),
            ServiceDescriptor::for_flavor(flavor),
            archives,
        )
    }

    /// Controller from explicit parts. Used by tests and by callers
    /// embedding the lifecycle around a custom daemon.
    pub fn with_parts(
        config: SessionConfig,
        profile: PersistenceProfile,
        service: ServiceDescriptor,
        archives: Vec<ArchiveTarget>,
    ) -> Self {
        Self {
            config,
            profile,
            service,
            archives,
            started_at: Local::now(),
            armed: false,
            backed_up: false,
            reachable: false,
            children: Vec::new(),
        }
    }

    /// Whether the credential bootstrap succeeded.
    pub fn reachable(&self) -> bool {
        self.reachable
    }

    /// Run the startup sequence: restore -> overlay -> credentials ->
    /// packages -> service daemons.
    ///
    /// Restore and overlay failures are soft (the session continues with
    /// image defaults). A credential failure leaves the session running
    /// but unreachable. Package and service failures are fatal and
    /// propagate.
    pub fn start(&mut self) -> Result<()> {
        info!(
            "Starting {} session for {}",
            self.profile.name,
            self.config.home_dir.display()
        );

        // 1. Restore prior snapshots (fail-soft)
        for target in &self.archives {
            match restore(&target.archive, &target.source, &[RECOVERY_DIR]) {
                Ok(true) => info!("Restored {}", target.source.display()),
                Ok(false) => {}
                Err(e) => warn!(
                    "Restore of {} failed ({}); continuing with image defaults",
                    target.source.display(),
                    e
                ),
            }
        }

        // 2. Overlay persistent paths (fail-soft)
        if let Err(e) = setup_overlay(&self.profile, &self.config.home_dir, &self.config.mirror_dir)
        {
            warn!("Persistence overlay failed: {}", e);
        }

        // From here on a shutdown backup makes sense.
        self.armed = true;

        // 3. Credentials (fatal to reachability, not to the process)
        match bootstrap_from_env(&self.config.pubkey_var, &self.config.ssh_dir()) {
            Ok(report) => {
                self.reachable = true;
                info!(
                    "Credential bootstrap complete (key length {}, {})",
                    report.key_len,
                    if report.appended {
                        "appended"
                    } else {
                        "already present"
                    }
                );
            }
            Err(e) => {
                error!("{}", e);
                error!("Session will be UNREACHABLE; continuing so logs stay inspectable");
            }
        }

        // 4. Requested packages (fatal)
        install_packages(&self.config.extra_packages)?;

        // 5. Remote-access daemons (fatal)
        for command in &self.service.commands {
            let child = spawn_daemon(command)?;
            info!("Started {} ({:?})", self.service.name, command[0]);
            self.children.push(child);
        }

        Ok(())
    }

    /// Block in the idle monitor until the timeout fires or `stop` is
    /// set from the signal path.
    pub fn run(&mut self, stop: Option<Arc<AtomicBool>>) -> Result<MonitorExit> {
        let probe = self.service.probe()?;
        let mut monitor = IdleMonitor::new(
            probe,
            self.config.idle_timeout(),
            self.config.check_interval(),
        );
        if let Some(stop) = stop {
            // Share the caller's flag so a signal can interrupt the loop.
            monitor = monitor.with_stop_flag(stop);
        }
        monitor.run()
    }

    /// Archive every target back to durable storage and reap the service
    /// daemons. Safe to call more than once; only the first call does
    /// work. Backup failures are logged and swallowed so shutdown always
    /// completes.
    pub fn shutdown(&mut self) {
        if self.backed_up {
            return;
        }
        self.backed_up = true;

        if !self.armed {
            info!("Shutdown before restore phase; skipping backup");
        } else {
            for target in &self.archives {
                match backup(&target.source, &target.archive, &[RECOVERY_DIR]) {
                    Ok(size) => info!(
                        "Backup of {} saved to {} ({})",
                        target.source.display(),
                        target.archive.display(),
                        ByteSize(size)
                    ),
                    Err(e) => warn!("Backup of {} failed: {}", target.source.display(), e),
                }
            }
        }

        for mut child in self.children.drain(..) {
            let _ = child.kill();
            let _ = child.wait();
        }

        let uptime = Local::now().signed_duration_since(self.started_at);
        info!(
            "Session ended after {}m{}s",
            uptime.num_minutes(),
            uptime.num_seconds() % 60
        );
    }
}

fn spawn_daemon(command: &[String]) -> Result<Child> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| DevboxError::Service("empty daemon command".to_string()))?;

    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| DevboxError::Service(format!("failed to start {}: {}", program, e)))
}
