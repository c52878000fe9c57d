//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "hwt", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Fetch the signed transport configuration from this URL
    #[arg(long)]
    pub config_url: Option<String>,

    /// Base URL of the bridge daemon
    #[arg(long)]
    pub bridge_url: Option<String>,

    /// Skip the browser extension relay
    #[arg(long)]
    pub no_extension: bool,

    /// Skip the bridge daemon
    #[arg(long)]
    pub no_bridge: bool,

    /// Skip the native plugin host
    #[arg(long)]
    pub no_plugin: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Show which transport would be selected, without configuring it
    Probe,
    /// List connected devices as JSON
    Devices {
        /// Wait for a device to be connected
        #[arg(short, long)]
        wait: bool,
    },
    /// Send one message to a device and print the response
    Call {
        /// Device path as listed by `devices`
        #[arg(short, long)]
        path: String,
        /// Message name, e.g. `GetFeatures`
        name: String,
        /// Message payload as a JSON object
        #[arg(short, long)]
        data: Option<String>,
    },
}
