//! Command-line interface definitions using clap derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Catfish pond water advisor
#[derive(Parser, Debug)]
#[command(name = "pond-advisor")]
#[command(about = "Learns and serves a Q-learning policy for pond water management")]
#[command(version)]
pub struct Cli {
    /// Settings file to use instead of ./pond.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a policy against the pond simulator
    Train {
        /// Number of training episodes
        #[arg(long)]
        episodes: Option<usize>,

        /// Seed both the simulator and exploration for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Where to write the policy table
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Interactive consultation on the terminal
    Advise,
    /// One-shot recommendation for the given readings
    Recommend {
        /// Water temperature in °C
        #[arg(long, allow_hyphen_values = true)]
        temperature: String,

        /// pH level
        #[arg(long, allow_hyphen_values = true)]
        ph: String,

        /// Dissolved oxygen in mg/L
        #[arg(long, allow_hyphen_values = true)]
        dissolved_oxygen: String,
    },
    /// Start the dashboard HTTP API
    Serve {
        /// Address to bind to, overriding the configured host and port
        #[arg(long)]
        addr: Option<std::net::SocketAddr>,
    },
    /// Print the effective settings as TOML
    ShowConfig,
}
