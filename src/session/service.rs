//! Remote-access service descriptors
//!
//! A descriptor bundles the one genuinely flavor-specific surface: which
//! daemon(s) to launch and how to tell whether anyone is connected to
//! them. Everything else in the lifecycle is flavor-independent.

use crate::error::Result;
use crate::monitor::{ProcessTableProbe, SessionManagerCountProbe, SessionProbe};
use crate::profile::SessionFlavor;

/// Pattern matching sshd's per-connection processes (`sshd: root@pts/0`).
const SSHD_SESSION_PATTERN: &str = r"sshd: .+@";

/// How to launch and probe one flavor's remote-access service.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// Service name for diagnostics
    pub name: &'static str,
    /// Daemon launch commands, each argv-style
    pub commands: Vec<Vec<String>>,
    probe_kind: ProbeKind,
}

#[derive(Debug, Clone)]
enum ProbeKind {
    ProcessTable { pattern: &'static str },
    SessionManagerCount { daemon: &'static str },
}

impl ServiceDescriptor {
    /// The standard service for a flavor.
    pub fn for_flavor(flavor: SessionFlavor) -> Self {
        match flavor {
            // Inference sessions are reached over SSH like terminal ones;
            // they differ in persistence profile and archive targets.
            SessionFlavor::Ssh | SessionFlavor::Inference => Self {
                name: "sshd",
                commands: vec![vec!["/usr/sbin/sshd".to_string()]],
                probe_kind: ProbeKind::ProcessTable {
                    pattern: SSHD_SESSION_PATTERN,
                },
            },
            SessionFlavor::Rdp => Self {
                name: "xrdp",
                commands: vec![
                    vec!["/usr/sbin/xrdp".to_string()],
                    vec!["/usr/sbin/xrdp-sesman".to_string()],
                ],
                probe_kind: ProbeKind::SessionManagerCount {
                    daemon: "xrdp-sesman",
                },
            },
        }
    }

    /// A descriptor with an arbitrary command and probe pattern, for
    /// callers embedding the lifecycle around their own daemon.
    pub fn custom(name: &'static str, command: Vec<String>, pattern: &'static str) -> Self {
        Self {
            name,
            commands: vec![command],
            probe_kind: ProbeKind::ProcessTable { pattern },
        }
    }

    /// Build this service's session probe.
    pub fn probe(&self) -> Result<Box<dyn SessionProbe>> {
        match &self.probe_kind {
            ProbeKind::ProcessTable { pattern } => {
                Ok(Box::new(ProcessTableProbe::new(pattern)?))
            }
            ProbeKind::SessionManagerCount { daemon } => {
                Ok(Box::new(SessionManagerCountProbe::new(*daemon)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_services() {
        let ssh = ServiceDescriptor::for_flavor(SessionFlavor::Ssh);
        assert_eq!(ssh.name, "sshd");
        assert_eq!(ssh.commands.len(), 1);

        let rdp = ServiceDescriptor::for_flavor(SessionFlavor::Rdp);
        assert_eq!(rdp.name, "xrdp");
        assert_eq!(rdp.commands.len(), 2);

        let inference = ServiceDescriptor::for_flavor(SessionFlavor::Inference);
        assert_eq!(inference.name, "sshd");
    }

    #[test]
    fn test_probes_construct() {
        for flavor in [
            SessionFlavor::Ssh,
            SessionFlavor::Rdp,
            SessionFlavor::Inference,
        ] {
            assert!(ServiceDescriptor::for_flavor(flavor).probe().is_ok());
        }
    }
}
