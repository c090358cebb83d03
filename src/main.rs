//! Devbox CLI - drive a container session from restore to backup

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use devbox::cli::{Args, SubCommand};
use devbox::{
    normalize_package_names, MonitorExit, PersistenceProfile, SessionConfig, SessionController,
    SessionFlavor,
};

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        SubCommand::Run {
            flavor,
            config,
            idle_timeout,
            check_interval,
            home,
            storage,
            packages,
        } => {
            let config = build_config(config, idle_timeout, check_interval, home, storage, packages)?;
            run_session(flavor, config)
        }

        SubCommand::Profiles => {
            let profiles: Vec<PersistenceProfile> = [
                SessionFlavor::Ssh,
                SessionFlavor::Rdp,
                SessionFlavor::Inference,
            ]
            .into_iter()
            .map(PersistenceProfile::for_flavor)
            .collect();

            if args.json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else {
                for profile in &profiles {
                    println!("{} ({} items):", profile.name, profile.items.len());
                    for item in &profile.items {
                        let kind = if item.dir { "dir " } else { "file" };
                        println!("  {} {}", kind, item.rel_path);
                    }
                    println!();
                }
            }
            Ok(())
        }
    }
}

fn build_config(
    config_file: Option<PathBuf>,
    idle_timeout: Option<u64>,
    check_interval: Option<u64>,
    home: Option<PathBuf>,
    storage: Option<PathBuf>,
    packages: Vec<String>,
) -> anyhow::Result<SessionConfig> {
    let mut config = match config_file {
        Some(path) => SessionConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SessionConfig::default(),
    };

    if let Some(secs) = idle_timeout {
        config.idle_timeout_secs = secs;
    }
    if let Some(secs) = check_interval {
        config.check_interval_secs = secs;
    }
    if let Some(home) = home {
        config.home_dir = home;
    }
    if let Some(storage) = storage {
        config.mirror_dir = storage.join(".config_persistence");
        config.archive_path = storage.join("root_full_backup.tar.gz");
        config.storage_dir = storage;
    }
    if !packages.is_empty() {
        config.extra_packages = normalize_package_names(packages);
    }

    Ok(config)
}

fn run_session(flavor: SessionFlavor, config: SessionConfig) -> anyhow::Result<()> {
    let mut session = SessionController::for_flavor(flavor, config);

    // The stop flag shared with the idle monitor; the signal handler
    // sets it so SIGINT/SIGTERM take the same orderly shutdown path as
    // an idle timeout.
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("setting signal handler")?;

    let started = session.start();
    if let Err(e) = &started {
        warn!("Startup aborted: {}", e);
    }

    if started.is_ok() {
        match session.run(Some(stop))? {
            MonitorExit::IdleTimeout => info!("Shutting down after idle timeout"),
            MonitorExit::Interrupted => info!("Shutting down on signal"),
        }
    }

    // Backup runs on every exit path once the restore phase has run.
    session.shutdown();

    started.map_err(Into::into)
}
