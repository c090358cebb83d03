//! Devbox - session lifecycle manager for ephemeral dev containers
//!
//! Devbox restores a prior session from cold storage, overlays persistent
//! dotfiles onto durable storage via symlinks, bootstraps SSH credentials,
//! launches the remote-access service and shuts the container down after a
//! stretch of inactivity, archiving the home directory on the way out.
//!
//! # Example
//!
//! ```no_run
//! use devbox::{SessionConfig, SessionController, SessionFlavor};
//!
//! let config = SessionConfig::default();
//! let mut session = SessionController::for_flavor(SessionFlavor::Ssh, config);
//! session.start().unwrap();
//! session.run(None).unwrap();
//! session.shutdown();
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod monitor;
pub mod packages;
pub mod persist;
pub mod profile;
pub mod session;

pub use archive::{backup, restore, ArchiveTarget, RECOVERY_DIR};
pub use config::SessionConfig;
pub use credentials::{bootstrap_from_env, install_key, CredentialReport};
pub use error::{DevboxError, Result};
pub use monitor::{IdleMonitor, MonitorExit, SessionProbe};
pub use packages::{install_packages, normalize_package_names};
pub use persist::setup_overlay;
pub use profile::{PersistenceItem, PersistenceProfile, SessionFlavor};
pub use session::{ServiceDescriptor, SessionController};
