//! Backup/restore archiver for session snapshots

pub mod snapshot;

pub use snapshot::{backup, restore, ArchiveTarget, RECOVERY_DIR};
