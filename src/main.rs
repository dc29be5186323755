use clap::Parser as CliParser;
use minijc::driver::{Cli, CompilerDriver, DriverError};
use std::process::exit;

fn main() {
    if !run() {
        exit(1);
    }
}

/// Parse the command line and compile; `false` on any error.
fn run() -> bool {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    let _ = logger.try_init();

    let mut driver = CompilerDriver::new(cli);
    match driver.run() {
        Ok(()) => true,
        // diagnostics are already printed
        Err(DriverError::CompilationFailed) => false,
        Err(e) => {
            eprintln!("{}", e);
            false
        }
    }
}
