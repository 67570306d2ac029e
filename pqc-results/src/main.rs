use clap::Parser;
use log::error;
use pqc_results::cli::CliArgs;
use std::process::exit;

/// Catches errors, prints them through the logger, then exits
pub fn main() {
    let args = CliArgs::parse();

    env_logger::Builder::new()
        .filter_level(args.get_log_level().unwrap_or(log::LevelFilter::Info))
        .init();

    match args.run() {
        Ok(_) => {}
        Err(e) => {
            error!("{e:#}");
            exit(1);
        }
    }
}
