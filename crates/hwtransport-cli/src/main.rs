//! hwt - probe transports and talk to hardware security devices

use clap::Parser;
use tracing::error;

use hwtransport_cli::{cli::Cli, commands::CommandDispatcher, config::load_configuration, error::Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.verbose);

    // Load configuration and apply command-line overrides
    let config = load_configuration(&cli)?;

    if let Err(e) = CommandDispatcher::execute(cli.command, &config).await {
        error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Setup logging based on verbosity level
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
