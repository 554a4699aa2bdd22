use crate::cli::ParleyRunnerCli;
use clap::Parser;

/// Initialise logging and the CLI for the Parley runner.
pub fn init() -> ParleyRunnerCli {
    env_logger::init();

    ParleyRunnerCli::parse()
}
