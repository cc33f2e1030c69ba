use std::process::ExitCode;

use clap::Parser;
use libpocket::{cli::Cli, commands};
use tracing::Level;

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level(cli.verbose))
        .with_target(false)
        .init();

    match commands::run(cli) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("Error: {:?}", color_eyre::Report::new(e));
            Ok(ExitCode::from(code))
        }
    }
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
