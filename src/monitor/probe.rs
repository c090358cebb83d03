//! Session probes
//!
//! A probe answers one question: how many remote-access sessions are
//! currently attached to this container? The two implementations cover
//! the daemons we launch: sshd spawns one `sshd: user@pts/N` process per
//! connection, and xrdp-sesman spawns one child per desktop session with
//! the X display number on its command line.

use log::debug;
use regex::Regex;
use sysinfo::System;

use crate::error::{DevboxError, Result};

/// A query for attached remote-access sessions.
pub trait SessionProbe: Send {
    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Number of sessions currently attached.
    fn active_sessions(&self) -> Result<usize>;
}

/// Matches a regex against every process in the process table.
///
/// Replaces the shell pipeline `ps -ef | grep 'sshd: root@' | grep -v grep`:
/// the monitor's own process is excluded instead of grep's.
pub struct ProcessTableProbe {
    pattern: Regex,
}

impl ProcessTableProbe {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| DevboxError::Probe(format!("invalid pattern: {}", e)))?;
        Ok(Self { pattern })
    }
}

impl SessionProbe for ProcessTableProbe {
    fn name(&self) -> &str {
        "process-table"
    }

    fn active_sessions(&self) -> Result<usize> {
        let mut sys = System::new_all();
        sys.refresh_all();

        let own_pid = std::process::id();
        let count = sys
            .processes()
            .iter()
            .filter(|(pid, process)| {
                if pid.as_u32() == own_pid {
                    return false;
                }
                let cmdline = process.cmd().join(" ");
                self.pattern.is_match(process.name()) || self.pattern.is_match(&cmdline)
            })
            .count();

        debug!("{} probe matched {} process(es)", self.name(), count);
        Ok(count)
    }
}

/// Counts per-session children of a session-manager daemon.
///
/// Replaces `ps aux | grep -c 'xrdp-sesman.*:'`: a session manager child
/// carries its display number (`:10` etc.) on the command line, while the
/// bare daemon does not.
pub struct SessionManagerCountProbe {
    daemon: String,
}

impl SessionManagerCountProbe {
    pub fn new(daemon: impl Into<String>) -> Self {
        Self {
            daemon: daemon.into(),
        }
    }
}

impl SessionProbe for SessionManagerCountProbe {
    fn name(&self) -> &str {
        "session-manager"
    }

    fn active_sessions(&self) -> Result<usize> {
        let mut sys = System::new_all();
        sys.refresh_all();

        let count = sys
            .processes()
            .values()
            .filter(|process| {
                if !process.name().contains(&self.daemon) {
                    return false;
                }
                process.cmd().iter().skip(1).any(|arg| arg.contains(':'))
            })
            .count();

        debug!(
            "{} probe counted {} session(s) for {}",
            self.name(),
            count,
            self.daemon
        );
        Ok(count)
    }
}
