//! matchqlc entry point

use clap::Parser;
use matchql_cli::{compile_file, CliOptions};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let options = CliOptions::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.log_filter())),
        )
        .init();

    match compile_file(&options) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
