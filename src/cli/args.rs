//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::profile::SessionFlavor;

#[derive(Parser)]
#[command(name = "devbox")]
#[command(author, version, about = "Session lifecycle manager for ephemeral dev containers", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubCommand,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum SubCommand {
    /// Run a container session to completion (restore, overlay,
    /// credentials, service, idle monitor, backup)
    Run {
        /// Session flavor (ssh, rdp, inference)
        #[arg(long, default_value = "ssh")]
        flavor: SessionFlavor,

        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Idle seconds before shutdown (overrides config)
        #[arg(long)]
        idle_timeout: Option<u64>,

        /// Seconds between session checks (overrides config)
        #[arg(long)]
        check_interval: Option<u64>,

        /// Session home directory (overrides config)
        #[arg(long)]
        home: Option<PathBuf>,

        /// Durable storage mount (overrides config)
        #[arg(long)]
        storage: Option<PathBuf>,

        /// Extra apt package to install (repeatable)
        #[arg(long = "package", value_name = "NAME")]
        packages: Vec<String>,
    },

    /// Show the persistence profile of each session flavor
    Profiles,
}
