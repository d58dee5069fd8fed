//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// devinput - List, classify and listen to Linux input devices
#[derive(Parser, Debug)]
#[command(name = "devinput")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every input device
    List {
        /// Show classes and supported event types
        #[arg(short, long)]
        detailed: bool,
    },

    /// List keyboards
    Keyboards,

    /// List pointer devices (mice and touch devices)
    Pointers,

    /// List mice
    Mice,

    /// List touch devices
    Touch,

    /// Show one device's identity and capabilities
    Show {
        /// Device id (N in /dev/input/eventN)
        id: u32,
    },

    /// Print events from one or more devices until Ctrl-C
    Listen {
        /// Device ids (N in /dev/input/eventN)
        #[arg(required = true)]
        ids: Vec<u32>,

        /// Print one JSON object per event
        #[arg(short, long)]
        json: bool,

        /// Stop every device once a key with this code is pressed
        #[arg(short, long)]
        exit_on: Option<u16>,
    },

    /// View or create configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
