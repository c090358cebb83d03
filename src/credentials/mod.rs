//! SSH credential bootstrap

pub mod bootstrap;

pub use bootstrap::{
    bootstrap_from_env, install_key, CredentialReport, AUTHORIZED_KEYS_MODE, SSH_DIR_MODE,
};
