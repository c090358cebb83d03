//! End-to-end lifecycle tests over temporary directories
//!
//! These drive a real `SessionController` with a no-op daemon command so
//! the full restore -> overlay -> credentials -> service sequence runs
//! without sshd or durable storage.

use std::fs;
use std::path::Path;

use devbox::{
    backup, ArchiveTarget, PersistenceProfile, ServiceDescriptor, SessionConfig, SessionController,
    SessionFlavor,
};

const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFlowTestKey dev@flow";

fn test_config(root: &Path, pubkey_var: &str) -> SessionConfig {
    SessionConfig {
        home_dir: root.join("home"),
        storage_dir: root.join("data"),
        mirror_dir: root.join("data/.config_persistence"),
        archive_path: root.join("data/root_full_backup.tar.gz"),
        idle_timeout_secs: 300,
        check_interval_secs: 15,
        pubkey_var: pubkey_var.to_string(),
        extra_packages: Vec::new(),
    }
}

fn noop_service() -> ServiceDescriptor {
    ServiceDescriptor::custom(
        "noop",
        vec!["true".to_string()],
        "no-session-ever-matches-this",
    )
}

fn controller(config: SessionConfig) -> SessionController {
    let archives = vec![ArchiveTarget::new(&config.home_dir, &config.archive_path)];
    SessionController::with_parts(
        config,
        PersistenceProfile::for_flavor(SessionFlavor::Ssh),
        noop_service(),
        archives,
    )
}

#[test]
fn restored_file_at_persistence_path_is_superseded_by_link() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("DEVBOX_FLOW_TEST_PUBKEY_1", KEY);
    let config = test_config(tmp.path(), "DEVBOX_FLOW_TEST_PUBKEY_1");

    // Build a snapshot of a prior session whose home held a *plain file*
    // at .bashrc, which is also a persistence item.
    let prior_home = tmp.path().join("prior");
    fs::create_dir_all(&prior_home).unwrap();
    fs::write(prior_home.join(".bashrc"), "prior session aliases").unwrap();
    fs::write(prior_home.join("notes.md"), "keep me").unwrap();
    fs::create_dir_all(config.archive_path.parent().unwrap()).unwrap();
    backup(&prior_home, &config.archive_path, &[]).unwrap();

    fs::create_dir_all(&config.home_dir).unwrap();
    let home = config.home_dir.clone();
    let mirror = config.mirror_dir.clone();

    let mut session = controller(config);
    session.start().unwrap();

    // Non-persistence content was restored as-is
    assert_eq!(
        fs::read_to_string(home.join("notes.md")).unwrap(),
        "keep me"
    );

    // The persistence path ends up as a symlink into the mirror, not the
    // restored plain file: the overlay supersedes restored content.
    let bashrc = home.join(".bashrc");
    let meta = fs::symlink_metadata(&bashrc).unwrap();
    assert!(meta.file_type().is_symlink());
    assert_eq!(fs::read_link(&bashrc).unwrap(), mirror.join(".bashrc"));

    session.shutdown();
}

#[test]
fn credentials_land_after_restore_of_stale_key_file() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("DEVBOX_FLOW_TEST_PUBKEY_2", KEY);
    let config = test_config(tmp.path(), "DEVBOX_FLOW_TEST_PUBKEY_2");

    // Prior session archived a stale authorized_keys
    let prior_home = tmp.path().join("prior");
    fs::create_dir_all(prior_home.join(".ssh")).unwrap();
    fs::write(
        prior_home.join(".ssh/authorized_keys"),
        "ssh-rsa STALEKEY old@host\n",
    )
    .unwrap();
    fs::create_dir_all(config.archive_path.parent().unwrap()).unwrap();
    backup(&prior_home, &config.archive_path, &[]).unwrap();

    fs::create_dir_all(&config.home_dir).unwrap();
    let keys_file = config.home_dir.join(".ssh/authorized_keys");

    let mut session = controller(config);
    session.start().unwrap();
    assert!(session.reachable());

    // The fresh key was injected after the stale file came back
    let content = fs::read_to_string(&keys_file).unwrap();
    assert!(content.contains(KEY));
    assert!(content.contains("STALEKEY"));

    session.shutdown();
}

#[test]
fn shutdown_archives_home_for_next_startup() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("DEVBOX_FLOW_TEST_PUBKEY_3", KEY);
    let config = test_config(tmp.path(), "DEVBOX_FLOW_TEST_PUBKEY_3");
    let home = config.home_dir.clone();
    let archive_path = config.archive_path.clone();
    fs::create_dir_all(&home).unwrap();

    let mut session = controller(config);
    session.start().unwrap();
    fs::write(home.join("work-in-progress.rs"), "fn wip() {}").unwrap();
    session.shutdown();
    assert!(archive_path.exists());

    // A second container picks the snapshot up on startup
    let next_root = tmp.path().join("next");
    let mut next_config = test_config(&next_root, "DEVBOX_FLOW_TEST_PUBKEY_3");
    next_config.archive_path = archive_path;
    let next_home = next_config.home_dir.clone();
    fs::create_dir_all(&next_home).unwrap();

    let mut next = controller(next_config);
    next.start().unwrap();
    assert_eq!(
        fs::read_to_string(next_home.join("work-in-progress.rs")).unwrap(),
        "fn wip() {}"
    );
    next.shutdown();
}

#[test]
fn missing_pubkey_leaves_session_running_but_unreachable() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path(), "DEVBOX_FLOW_TEST_PUBKEY_UNSET");
    fs::create_dir_all(&config.home_dir).unwrap();
    let home = config.home_dir.clone();
    let mirror = config.mirror_dir.clone();

    let mut session = controller(config);
    // Startup still succeeds: reachability failure is not process-fatal
    session.start().unwrap();
    assert!(!session.reachable());

    // The rest of the sequence still ran
    assert!(fs::symlink_metadata(home.join(".bashrc"))
        .unwrap()
        .file_type()
        .is_symlink());
    assert_eq!(fs::read_link(home.join(".bashrc")).unwrap(), mirror.join(".bashrc"));

    session.shutdown();
}
