//! Error types for Devbox

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevboxError {
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Package installation failed: {0}")]
    PackageInstall(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid session flavor: {0} (expected ssh, rdp or inference)")]
    InvalidFlavor(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DevboxError>;
